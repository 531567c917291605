//! Octave value noise over absolute world coordinates.
//!
//! The base primitive is a sine scramble of the input coordinate, so the
//! field is a pure function of position: adjacent chunks sampling the same
//! absolute cell always read the same value, which is what keeps chunk
//! seams free of discontinuities.

const OCTAVES: u32 = 4;
const PERSISTENCE: f64 = 0.5;

#[inline]
fn scramble(x: f64, y: f64) -> f64 {
    let n = x * 1_234_567.0 + y * 7_654_321.0;
    let v = n.sin() * 43_758.545_312_3;
    v.sin() * v.cos()
}

/// 4-octave value noise mapped into `[0, 1]`. Amplitude halves and frequency
/// doubles each octave.
pub fn octave_noise(x: f64, y: f64) -> f64 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    for _ in 0..OCTAVES {
        value += scramble(x * frequency, y * frequency) * amplitude;
        amplitude *= PERSISTENCE;
        frequency *= 2.0;
    }
    (value + 1.0) / 2.0
}

/// Sample a noise field at an absolute cell. The offset decorrelates fields
/// that share a scale and is applied to the coordinate before scaling.
#[inline]
pub fn sample_field(wx: i32, wy: i32, scale: f64, offset: f64) -> f64 {
    octave_noise((wx as f64 + offset) * scale, (wy as f64 + offset) * scale)
}
