//! The test byte sequence shared by both ends of the link.
//!
//! BSD linear congruential generator: `seed = (seed * 1103515245 + 12345) mod 2^31`,
//! emitting the low byte of each seed. A known algorithm keeps the sequence
//! identical on every platform taking part in a test.

const MULTIPLIER: u32 = 1103515245;
const INCREMENT: u32 = 12345;
const MASK: u32 = (1 << 31) - 1;

pub struct Lcg {
    seed: u32,
}

impl Lcg {
    pub fn new() -> Self {
        Self { seed: 1 }
    }

    /// Restarts the sequence from its first byte.
    pub fn reset(&mut self) {
        self.seed = 1;
    }

    pub fn next_byte(&mut self) -> u8 {
        self.seed = self.seed.wrapping_mul(MULTIPLIER).wrapping_add(INCREMENT) & MASK;
        self.seed as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_prefix() {
        let mut lcg = Lcg::new();
        // 1103527590, 377401575, 662824084
        assert_eq!(lcg.next_byte(), 0xa6);
        assert_eq!(lcg.next_byte(), 0xe7);
        assert_eq!(lcg.next_byte(), 0x94);
    }

    #[test]
    fn test_reset_repeats() {
        let mut lcg = Lcg::new();
        let first: Vec<u8> = (0..16).map(|_| lcg.next_byte()).collect();
        lcg.reset();
        let again: Vec<u8> = (0..16).map(|_| lcg.next_byte()).collect();
        assert_eq!(first, again);
    }
}
