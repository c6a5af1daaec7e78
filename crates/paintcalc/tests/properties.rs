//! Property tests for pricing and fingerprints

use paintcalc::prelude::*;
use paintcalc::{PricingCalculator, TierMultipliers};
use proptest::prelude::*;
use std::sync::Arc;

const ESTIMATOR: &str = include_str!("fixtures/estimator.json");

fn engine() -> Engine {
    let workbook = Workbook::from_json_str(ESTIMATOR).unwrap();
    Engine::with_defaults(Arc::new(CompiledWorkbook::compile(workbook).unwrap()))
}

/// Non-negative amounts with cents, up to ten million
fn amount() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn quality() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just("economy"), Just("standard"), Just("premium")]
}

fn estimate() -> impl Strategy<Value = EstimateInput> {
    (amount(), amount(), 0i64..40, quality(), any::<bool>()).prop_map(
        |(siding, interior, rooms, quality, primer)| {
            EstimateInput::new()
                .with("siding_sqft", siding)
                .with("interior_sqft", interior)
                .with("rooms", rooms)
                .with("paint_quality", quality)
                .with("primer", primer)
        },
    )
}

proptest! {
    #[test]
    fn tiers_are_ordered(labor in amount(), material in amount()) {
        let tiers = PricingCalculator::default().price_all(labor, material).unwrap();
        prop_assert!(tiers.good.final_price <= tiers.better.final_price);
        prop_assert!(tiers.better.final_price <= tiers.best.final_price);
    }

    #[test]
    fn tiers_are_ordered_for_any_non_decreasing_multipliers(
        labor in amount(),
        material in amount(),
        steps in (0u32..300, 0u32..300, 0u32..300),
    ) {
        let good = Decimal::new(steps.0 as i64, 2);
        let better = good + Decimal::new(steps.1 as i64, 2);
        let best = better + Decimal::new(steps.2 as i64, 2);
        let config = EngineConfig {
            tiers: TierMultipliers { good, better, best },
            ..EngineConfig::default()
        };
        config.validate().unwrap();

        let tiers = PricingCalculator::new(&config).price_all(labor, material).unwrap();
        prop_assert!(tiers.good.final_price <= tiers.better.final_price);
        prop_assert!(tiers.better.final_price <= tiers.best.final_price);
    }

    #[test]
    fn final_price_has_two_places(labor in amount(), material in amount()) {
        let tiers = PricingCalculator::default().price_all(labor, material).unwrap();
        prop_assert_eq!(tiers.good.final_price.scale(), 2);
        prop_assert_eq!(tiers.best.final_price.scale(), 2);
    }

    #[test]
    fn estimates_are_ordered_and_deterministic(input in estimate()) {
        let engine = engine();
        let first = engine.calculate(&input).unwrap();
        let second = engine.calculate(&input).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert!(first.final_price(PricingTier::Good) <= first.final_price(PricingTier::Better));
        prop_assert!(first.final_price(PricingTier::Better) <= first.final_price(PricingTier::Best));
    }

    #[test]
    fn fingerprint_ignores_field_insertion_order(siding in amount(), rooms in 0i64..40) {
        let engine = engine();
        let a = EstimateInput::new().with("siding_sqft", siding).with("rooms", rooms);
        let b = EstimateInput::new().with("rooms", rooms).with("siding_sqft", siding);
        prop_assert_eq!(engine.fingerprint(&a), engine.fingerprint(&b));
    }

    #[test]
    fn fingerprint_ignores_trailing_zeros(cents in 0i64..1_000_000) {
        let engine = engine();
        let plain = Decimal::new(cents, 2);
        let padded = Decimal::new(cents * 100, 4);
        prop_assert_eq!(
            engine.fingerprint(&EstimateInput::new().with("siding_sqft", plain)),
            engine.fingerprint(&EstimateInput::new().with("siding_sqft", padded))
        );
    }

    #[test]
    fn fingerprint_changes_with_values(a in amount(), b in amount()) {
        prop_assume!(a != b);
        let engine = engine();
        prop_assert_ne!(
            engine.fingerprint(&EstimateInput::new().with("siding_sqft", a)),
            engine.fingerprint(&EstimateInput::new().with("siding_sqft", b))
        );
    }
}
