use std::thread;

use crossbeam_channel::{Receiver, Sender, unbounded};

use overland_chunk::{Chunk, GenParams};
use overland_core::ChunkCoord;

pub(crate) struct GenJob {
    pub coord: ChunkCoord,
}

pub(crate) struct GenOut {
    pub coord: ChunkCoord,
    pub chunk: Chunk,
}

/// Single background generation worker. The grid submits one job at a time
/// and drains completions on its own tick, so all resident-map mutation
/// stays on the caller's thread.
pub(crate) struct GenWorker {
    job_tx: Sender<GenJob>,
    res_rx: Receiver<GenOut>,
}

impl GenWorker {
    pub fn new(chunk_size: usize, params: GenParams) -> Self {
        let (job_tx, job_rx) = unbounded::<GenJob>();
        let (res_tx, res_rx) = unbounded::<GenOut>();
        thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                let chunk = Chunk::generate(job.coord, chunk_size, &params);
                if res_tx
                    .send(GenOut {
                        coord: job.coord,
                        chunk,
                    })
                    .is_err()
                {
                    break;
                }
            }
        });
        Self { job_tx, res_rx }
    }

    pub fn submit(&self, coord: ChunkCoord) -> bool {
        self.job_tx.send(GenJob { coord }).is_ok()
    }

    pub fn drain(&self) -> Vec<GenOut> {
        self.res_rx.try_iter().collect()
    }
}
