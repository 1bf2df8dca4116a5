//! Deterministic uniform sampling over integer ranges.
//!
//! Ported from `original_source/musique/random.hh`/`.cc`'s manual
//! inverse-transform `uniform(generator, a, b)` and Fisher-Yates `shuffle` —
//! intentionally *not* `rand::distributions::Uniform`, whose algorithm is not
//! guaranteed stable across `rand` versions. This one is, because it's ours:
//! generate a uniformly distributed value across the generator's native
//! range, then reject-and-retry (upscale/downscale) until it falls in a
//! range evenly divisible by the span, giving every output in `[a, b]` equal
//! probability regardless of the generator's bit width.

use rand_core::RngCore;

/// Returns a uniformly distributed `i64` in `[a, b]` inclusive.
pub fn uniform(rng: &mut impl RngCore, a: i64, b: i64) -> i64 {
    debug_assert!(a <= b);
    let span = (b - a) as u64 + 1;
    if span == 0 {
        // The full u64 range was requested; any value is in range.
        return a.wrapping_add(rng.next_u64() as i64);
    }
    let limit = u64::MAX - (u64::MAX % span);
    loop {
        let v = rng.next_u64();
        if v < limit {
            return a + (v % span) as i64;
        }
    }
}

/// Manual Fisher-Yates shuffle using [`uniform`] rather than `rand::seq::SliceRandom`.
pub fn shuffle<T>(rng: &mut impl RngCore, slice: &mut [T]) {
    if slice.len() < 2 {
        return;
    }
    for i in (1..slice.len()).rev() {
        let j = uniform(rng, 0, i as i64) as usize;
        slice.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_pcg::Pcg64;
    use rand_core::SeedableRng;

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = Pcg64::seed_from_u64(42);
        for _ in 0..1000 {
            let v = uniform(&mut rng, 3, 9);
            assert!((3..=9).contains(&v));
        }
    }

    #[test]
    fn uniform_single_value_range() {
        let mut rng = Pcg64::seed_from_u64(1);
        for _ in 0..10 {
            assert_eq!(uniform(&mut rng, 5, 5), 5);
        }
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Pcg64::seed_from_u64(7);
        let mut v: Vec<i32> = (0..10).collect();
        let original = v.clone();
        shuffle(&mut rng, &mut v);
        let mut sorted = v.clone();
        sorted.sort();
        assert_eq!(sorted, original);
    }

    #[test]
    fn same_seed_gives_same_sequence() {
        let mut r1 = Pcg64::seed_from_u64(99);
        let mut r2 = Pcg64::seed_from_u64(99);
        let a: Vec<i64> = (0..20).map(|_| uniform(&mut r1, 0, 100)).collect();
        let b: Vec<i64> = (0..20).map(|_| uniform(&mut r2, 0, 100)).collect();
        assert_eq!(a, b);
    }
}
