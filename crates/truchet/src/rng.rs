//! Seeded random number generation for tile placement.
//!
//! The generator is part of the library (not `rand`) so that a seed gives
//! the same pattern on every platform and with every crate version.

/// A fast, deterministic pseudo-random number generator.
///
/// Uses a Linear Congruential Generator (LCG) with parameters from
/// Numerical Recipes. The seed is scrambled once with splitmix64 so that
/// neighbouring seeds (42, 43, ...) start from unrelated states.
///
/// # Example
/// ```
/// use truchet::rng::Rng;
///
/// let mut rng = Rng::new(12345);
/// let value = rng.next_f64(); // Returns value in [0, 1)
/// assert!((0.0..1.0).contains(&value));
/// ```
#[derive(Debug, Clone)]
pub struct Rng {
    state: u64,
}

impl Rng {
    /// Create a new RNG with the given seed.
    ///
    /// The same seed will always produce the same sequence of numbers.
    #[inline]
    pub fn new(seed: u64) -> Self {
        Self { state: splitmix64(seed) }
    }

    /// Get the next raw u64 value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        // LCG parameters from Numerical Recipes
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    /// Get a random f64 in the range [0, 1).
    #[inline]
    pub fn next_f64(&mut self) -> f64 {
        // Use high bits for better distribution
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Get a random index in the range [0, len).
    ///
    /// Returns 0 for `len == 0` (after still advancing the state).
    #[inline]
    pub fn next_index(&mut self, len: usize) -> usize {
        let idx = (self.next_f64() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }

    /// Pick one element of `items`, or `None` if it is empty.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.next_index(items.len());
        items.get(idx)
    }

    /// A rotation in degrees drawn uniformly from {0, 90, 180, 270}.
    #[inline]
    pub fn quarter_turn(&mut self) -> u16 {
        (self.next_index(4) as u16) * 90
    }
}

impl Default for Rng {
    fn default() -> Self {
        Self::new(0)
    }
}

fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
