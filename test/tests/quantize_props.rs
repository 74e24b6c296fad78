//! Property tests for the fixed-point codec's range contract.

use driftnet_shared::Quantizer;
use proptest::prelude::*;

proptest! {
    #[test]
    fn in_range_values_round_trip_within_bound(value in -2047.99f32..2047.99) {
        let q = Quantizer::default();
        let decoded = q.decode(q.encode(value));
        // Resolution bound for the default 12.4 split.
        prop_assert!((decoded - value).abs() <= 0.08);
    }

    #[test]
    fn every_finite_input_survives_encoding(value in -1.0e9f32..1.0e9) {
        let q = Quantizer::default();
        // Out-of-range inputs wrap, but never crash, and always decode to
        // something finite and in-range.
        let decoded = q.decode(q.encode(value));
        prop_assert!(decoded.is_finite());
        prop_assert!(decoded.abs() <= q.max_magnitude());
    }

    #[test]
    fn grid_multiples_are_lossless(ticks in -32768i32..32767) {
        let q = Quantizer::default();
        let value = ticks as f32 / q.scale();
        prop_assert_eq!(q.decode(q.encode(value)), value);
    }
}
