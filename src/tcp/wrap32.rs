use std::ops::Add;

/// A 32-bit sequence number as it appears on the wire.
///
/// Absolute sequence numbers are 64-bit and never wrap; the wire carries them
/// modulo 2^32, offset by the connection's initial sequence number (ISN).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wrap32 {
    value: u32,
}

impl Wrap32 {
    const WRAP_SIZE: u64 = 1 << 32;
    const HALF_WRAP: u64 = 1 << 31;

    pub fn new(value: u32) -> Self {
        Wrap32 { value }
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    /// Wrap an absolute sequence number `n` onto the wire, relative to `isn`.
    pub fn wrap(n: u64, isn: Wrap32) -> Self {
        Wrap32::new((isn.value as u64).wrapping_add(n) as u32)
    }

    /// Recover the absolute sequence number closest to `checkpoint`.
    ///
    /// Infinitely many absolute values map onto one wire value; the caller
    /// supplies its best estimate of the stream position and the candidate
    /// nearest to it wins. At exactly half-wrap distance the higher epoch is
    /// chosen.
    pub fn unwrap(&self, isn: Wrap32, checkpoint: u64) -> u64 {
        let offset = self.value.wrapping_sub(isn.value) as u64;
        // Number of full 2^32 epochs that puts `offset` within half a wrap
        // of the checkpoint.
        let epochs = (checkpoint + Self::HALF_WRAP).saturating_sub(offset) >> 32;
        offset + epochs * Self::WRAP_SIZE
    }
}

impl Add<u32> for Wrap32 {
    type Output = Wrap32;

    fn add(self, rhs: u32) -> Wrap32 {
        Wrap32::new(self.value.wrapping_add(rhs))
    }
}

// -- Unit tests --

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Distribution, Uniform};
    use rayon::prelude::*;

    // -- Test wrapping --

    #[test]
    fn test_wrap_exact_epoch() {
        let wrapped = Wrap32::wrap(3 * (1u64 << 32), Wrap32::new(0));
        assert_eq!(wrapped, Wrap32::new(0));
    }

    #[test]
    fn test_wrap_with_offset() {
        let wrapped = Wrap32::wrap(3 * (1u64 << 32) + 17, Wrap32::new(15));
        assert_eq!(wrapped, Wrap32::new(32));
    }

    #[test]
    fn test_wrap_just_below_epoch() {
        let wrapped = Wrap32::wrap(7 * (1u64 << 32) - 2, Wrap32::new(15));
        assert_eq!(wrapped, Wrap32::new(13));
    }

    // -- Test unwrapping --

    #[test]
    fn test_unwrap_near_zero_checkpoint() {
        assert_eq!(Wrap32::new(1).unwrap(Wrap32::new(0), 0), 1);
        assert_eq!(Wrap32::new(16).unwrap(Wrap32::new(16), 0), 0);
    }

    #[test]
    fn test_unwrap_after_first_wraparound() {
        let abs = Wrap32::new(1).unwrap(Wrap32::new(0), u32::MAX as u64);
        assert_eq!(abs, (1u64 << 32) + 1);
    }

    #[test]
    fn test_unwrap_below_third_wraparound() {
        let abs = Wrap32::new(u32::MAX - 1).unwrap(Wrap32::new(0), 3 * (1u64 << 32));
        assert_eq!(abs, 3 * (1u64 << 32) - 2);
    }

    #[test]
    fn test_unwrap_wire_below_isn() {
        // Wire value just below the ISN sits one short of a full wrap
        let abs = Wrap32::new(15).unwrap(Wrap32::new(16), 0);
        assert_eq!(abs, u32::MAX as u64);
    }

    #[test]
    fn test_unwrap_large_isn() {
        let abs = Wrap32::new(0).unwrap(Wrap32::new(i32::MAX as u32), 0);
        assert_eq!(abs, (i32::MAX as u64) + 2);
    }

    #[test]
    fn test_unwrap_half_wrap_resolves_up() {
        let abs = Wrap32::new(u32::MAX).unwrap(Wrap32::new(i32::MAX as u32), 0);
        assert_eq!(abs, 1u64 << 31);
    }

    // -- Test `+` operator overload --

    #[test]
    fn test_add_wraps() {
        assert_eq!(Wrap32::new(1) + 2, Wrap32::new(3));
        assert_eq!(Wrap32::new(u32::MAX) + 1, Wrap32::new(0));
    }

    // -- Test roundtrip --

    #[test]
    fn test_roundtrip() {
        fn check_roundtrip(isn: Wrap32, value: u64, checkpoint: u64) {
            assert_eq!(Wrap32::wrap(value, isn).unwrap(isn, checkpoint), value);
        }

        let n_reps = 100_000;
        let dist31 = Uniform::from(0u32..=(1u32 << 31) - 1);
        let dist32 = Uniform::from(0u32..=u32::MAX);
        let big_offset: u64 = (1u64 << 31) - 1;
        let dist63 = Uniform::from(big_offset..=(1u64 << 63));

        // Parallel sweep; any checkpoint within 2^31 of the value must recover it
        (0..n_reps).into_par_iter().for_each(|_| {
            let mut rng = rand::thread_rng();
            let isn = Wrap32::new(dist32.sample(&mut rng));
            let val = dist63.sample(&mut rng);
            let offset = dist31.sample(&mut rng) as u64;

            check_roundtrip(isn, val, val);
            check_roundtrip(isn, val + 1, val);
            check_roundtrip(isn, val - 1, val);
            check_roundtrip(isn, val + offset, val);
            check_roundtrip(isn, val - offset, val);
            check_roundtrip(isn, val + big_offset, val);
            check_roundtrip(isn, val - big_offset, val);
        });
    }
}
