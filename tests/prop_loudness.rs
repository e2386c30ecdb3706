use audibility_grid::{BandedLoudness, LOUDNESS_MAX, Loudness, LoudnessLevel};
use proptest::prelude::*;

fn decibels() -> impl Strategy<Value = i32> {
    -20i32..=(LOUDNESS_MAX as i32 + 20)
}

fn banded() -> impl Strategy<Value = BandedLoudness> {
    (decibels(), decibels(), decibels(), decibels())
        .prop_map(|(a, b, c, d)| BandedLoudness::new(a, b, c, d))
}

proptest! {
    // Merge is a semilattice join: idempotent, commutative, associative
    #[test]
    fn merge_laws(a in banded(), b in banded(), c in banded()) {
        prop_assert_eq!(a.max(a), a);
        prop_assert_eq!(a.max(b), b.max(a));
        prop_assert_eq!(a.max(b).max(c), a.max(b.max(c)));
    }

    #[test]
    fn scalar_merge_laws(a in decibels(), b in decibels(), c in decibels()) {
        let (a, b, c) = (LoudnessLevel::new(a), LoudnessLevel::new(b), LoudnessLevel::new(c));
        prop_assert_eq!(a.max(a), a);
        prop_assert_eq!(a.max(b), b.max(a));
        prop_assert_eq!(a.max(b).max(c), a.max(b.max(c)));
    }

    // Muffling never raises any band and muffling by nothing is the identity
    #[test]
    fn muffle_is_monotone(a in banded(), strength in banded(), amount in decibels()) {
        let muffled = a.muffle_by(strength);
        for band in 0..4 {
            prop_assert!(muffled.band(band) <= a.band(band));
            prop_assert!(muffled.band(band) >= 0);
        }
        prop_assert_eq!(a.muffle_by(BandedLoudness::SILENCE), a);
        prop_assert!(a.muffle_uniform(amount).peak() <= a.peak());
    }

    // A louder input never produces a quieter output
    #[test]
    fn muffle_preserves_order(x in decibels(), y in decibels(), strength in decibels()) {
        let (lo, hi) = (LoudnessLevel::new(x.min(y)), LoudnessLevel::new(x.max(y)));
        let s = LoudnessLevel::new(strength);
        prop_assert!(lo.muffle_by(s).decibels() <= hi.muffle_by(s).decibels());
    }

    #[test]
    fn construction_stays_in_range(a in any::<i32>()) {
        let level = LoudnessLevel::new(a);
        prop_assert!((0..=LOUDNESS_MAX).contains(&level.decibels()));
        prop_assert!((0.0..=1.0).contains(&level.normalized()));
    }
}
