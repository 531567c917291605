use overland_core::CellCoord;

/// Positions of the viewer and any movable agents. Read-only to consumers;
/// solidity queries do not consult it.
#[derive(Default, Debug, Clone)]
pub struct EntityRegistry {
    viewer: Option<CellCoord>,
    agents: Vec<CellCoord>,
}

impl EntityRegistry {
    #[inline]
    pub fn viewer(&self) -> Option<CellCoord> {
        self.viewer
    }

    pub(crate) fn set_viewer(&mut self, at: CellCoord) {
        self.viewer = Some(at);
    }

    #[inline]
    pub fn agents(&self) -> &[CellCoord] {
        &self.agents
    }

    pub fn set_agents(&mut self, agents: Vec<CellCoord>) {
        self.agents = agents;
    }

    pub fn push_agent(&mut self, at: CellCoord) {
        self.agents.push(at);
    }

    pub fn clear_agents(&mut self) {
        self.agents.clear();
    }
}
