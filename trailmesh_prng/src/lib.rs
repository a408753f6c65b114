// Deterministic random source for navmesh sampling.
//
// `NavRng` is xoshiro256++ (Blackman & Vigna, 2019) seeded through
// SplitMix64. The navigation core draws from it when it has to pick a random
// polygon or a random point inside one (`Pathfinder::random_node`). Callers
// own the generator and pass it in by `&mut`, so two agents sampling from the
// same zone never share hidden state and a replay with the same seed yields
// the same wander targets.
//
// See also: `trailmesh_nav::pathfinder` for the only consumer.
//
// **Critical constraint: determinism.** Output depends only on the seed and
// the number of draws. The integer core uses no floating point; the float
// helpers derive from the integer stream with exact power-of-two scaling.

use serde::{Deserialize, Serialize};

/// Seeded xoshiro256++ generator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavRng {
    state: [u64; 4],
}

impl NavRng {
    /// Expand a `u64` seed into the 256-bit state with SplitMix64.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let state = [
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
            splitmix64(&mut sm),
        ];
        Self { state }
    }

    pub fn next_u64(&mut self) -> u64 {
        let s = &mut self.state;
        let out = s[0].wrapping_add(s[3]).rotate_left(23).wrapping_add(s[0]);
        let shifted = s[1] << 17;

        s[2] ^= s[0];
        s[3] ^= s[1];
        s[1] ^= s[2];
        s[0] ^= s[3];
        s[2] ^= shifted;
        s[3] = s[3].rotate_left(45);

        out
    }

    /// Uniform `f32` in [0, 1), built from the top 24 bits.
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }

    /// Uniform `f32` in `[low, high)`. Returns `low` when the range is empty.
    pub fn range_f32(&mut self, low: f32, high: f32) -> f32 {
        if high <= low {
            return low;
        }
        low + self.next_f32() * (high - low)
    }

    /// Uniform index in `[0, len)` without modulo bias.
    ///
    /// Panics if `len == 0`.
    pub fn index(&mut self, len: usize) -> usize {
        assert!(len > 0, "NavRng::index: empty range");
        let span = len as u64;
        if span.is_power_of_two() {
            return (self.next_u64() & (span - 1)) as usize;
        }
        // Reject the low sliver of the u64 range that would bias the modulo.
        let threshold = span.wrapping_neg() % span;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return (r % span) as usize;
            }
        }
    }

    /// Pick one element uniformly; `None` for an empty slice.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            None
        } else {
            Some(&items[self.index(items.len())])
        }
    }

    /// Barycentric weights `[w0, w1, w2]` of a point uniformly distributed
    /// over a triangle. Uses the fold-over trick: a sample that lands in the
    /// far half of the unit parallelogram is mirrored back.
    pub fn barycentric(&mut self) -> [f32; 3] {
        let mut u = self.next_f32();
        let mut v = self.next_f32();
        if u + v > 1.0 {
            u = 1.0 - u;
            v = 1.0 - v;
        }
        [1.0 - u - v, u, v]
    }
}

/// SplitMix64 step, used only to expand seeds.
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9e37_79b9_7f4a_7c15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}
