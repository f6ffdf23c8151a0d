//! PCG32 random streams for per-pixel jitter.

use rand::RngCore;

/// PCG32 default multiplier.
const PCG_MULT: u64 = 6364136223846793005;

/// PCG32 (XSH-RR) with 64-bit state and a 64-bit stream increment.
///
/// Each render worker owns its own generator; a stream is never shared
/// between threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

impl Pcg32 {
    /// Create a generator from a state seed and a stream selector.
    ///
    /// Identical seeds always produce the identical sequence; distinct
    /// `stream_seed` values select distinct streams.
    pub fn new(state_seed: u64, stream_seed: u64) -> Self {
        let mut rng = Self {
            state: 0,
            inc: (stream_seed << 1) | 1,
        };
        rng.step();
        rng.state = rng.state.wrapping_add(state_seed);
        rng.step();
        rng
    }

    #[inline]
    fn step(&mut self) {
        self.state = self.state.wrapping_mul(PCG_MULT).wrapping_add(self.inc);
    }

    /// Generate the next 32-bit random value.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        let old = self.state;
        self.step();
        let xorshifted = (((old >> 18) ^ old) >> 27) as u32;
        let rot = (old >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Uniform float in [0, 1) from the top 24 bits of the next output.
    #[inline]
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 * (1.0 / 16_777_216.0)
    }
}

impl RngCore for Pcg32 {
    fn next_u32(&mut self) -> u32 {
        Pcg32::next_u32(self)
    }

    fn next_u64(&mut self) -> u64 {
        let lo = Pcg32::next_u32(self) as u64;
        let hi = Pcg32::next_u32(self) as u64;
        (hi << 32) | lo
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = Pcg32::next_u32(self).to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

/// How render workers seed their jitter streams.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StreamSeeding {
    /// Reseed from `(pass, row)` whenever a worker claims a row. Output is
    /// identical for any worker count.
    #[default]
    PerScanline,

    /// Seed once per worker from `(pass, worker)`. Output depends on which
    /// worker happened to claim which rows.
    PerWorker,
}

impl StreamSeeding {
    /// Generator for a worker at the start of a pass.
    pub fn worker_stream(self, pass: u32, worker: usize) -> Pcg32 {
        Pcg32::new(pass as u64, worker as u64)
    }

    /// Generator to use for a newly claimed row, if this policy reseeds.
    pub fn row_stream(self, pass: u32, row: u32) -> Option<Pcg32> {
        match self {
            StreamSeeding::PerScanline => Some(Pcg32::new(pass as u64, row as u64)),
            StreamSeeding::PerWorker => None,
        }
    }
}
