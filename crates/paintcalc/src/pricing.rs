//! Good/Better/Best pricing tiers

use crate::config::EngineConfig;
use crate::error::EngineError;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// A priced package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PricingTier {
    Good,
    Better,
    Best,
}

impl PricingTier {
    pub const ALL: [PricingTier; 3] = [PricingTier::Good, PricingTier::Better, PricingTier::Best];

    pub fn name(&self) -> &'static str {
        match self {
            PricingTier::Good => "good",
            PricingTier::Better => "better",
            PricingTier::Best => "best",
        }
    }
}

impl fmt::Display for PricingTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Price breakdown for one tier
///
/// Labor, material and subtotal are exact; only the final price is rounded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPrice {
    pub labor_cost: Decimal,
    pub material_cost: Decimal,
    pub subtotal: Decimal,
    pub final_price: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierPrices {
    pub good: TierPrice,
    pub better: TierPrice,
    pub best: TierPrice,
}

impl TierPrices {
    pub fn get(&self, tier: PricingTier) -> &TierPrice {
        match tier {
            PricingTier::Good => &self.good,
            PricingTier::Better => &self.better,
            PricingTier::Best => &self.best,
        }
    }
}

/// Derives the three tier prices from labor and material totals
#[derive(Debug, Clone)]
pub struct PricingCalculator {
    markup_divisor: Decimal,
    multipliers: [Decimal; 3],
    price_scale: u32,
}

impl PricingCalculator {
    /// Build from a validated configuration
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            markup_divisor: config.markup_divisor,
            multipliers: [config.tiers.good, config.tiers.better, config.tiers.best],
            price_scale: config.price_scale,
        }
    }

    pub fn multiplier(&self, tier: PricingTier) -> Decimal {
        self.multipliers[tier as usize]
    }

    pub fn markup_divisor(&self) -> Decimal {
        self.markup_divisor
    }

    /// Price a single tier
    pub fn price(
        &self,
        tier: PricingTier,
        labor: Decimal,
        material: Decimal,
    ) -> Result<TierPrice, EngineError> {
        let overflow = || EngineError::PriceOverflow {
            tier: tier.name().to_string(),
        };
        let multiplier = self.multiplier(tier);

        let labor_cost = labor.checked_mul(multiplier).ok_or_else(overflow)?;
        let material_cost = material.checked_mul(multiplier).ok_or_else(overflow)?;
        let subtotal = labor_cost.checked_add(material_cost).ok_or_else(overflow)?;
        let mut final_price = subtotal
            .checked_div(self.markup_divisor)
            .ok_or_else(overflow)?
            .round_dp_with_strategy(self.price_scale, RoundingStrategy::MidpointAwayFromZero);
        final_price.rescale(self.price_scale);

        Ok(TierPrice {
            labor_cost: labor_cost.normalize(),
            material_cost: material_cost.normalize(),
            subtotal: subtotal.normalize(),
            final_price,
        })
    }

    /// Price all three tiers
    pub fn price_all(&self, labor: Decimal, material: Decimal) -> Result<TierPrices, EngineError> {
        Ok(TierPrices {
            good: self.price(PricingTier::Good, labor, material)?,
            better: self.price(PricingTier::Better, labor, material)?,
            best: self.price(PricingTier::Best, labor, material)?,
        })
    }
}

impl Default for PricingCalculator {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_example() {
        let prices = PricingCalculator::default()
            .price_all(dec!(2000), dec!(1000))
            .unwrap();

        assert_eq!(prices.good.subtotal, dec!(3000));
        assert_eq!(prices.good.final_price, dec!(6666.67));
        assert_eq!(prices.better.labor_cost, dec!(2600));
        assert_eq!(prices.better.material_cost, dec!(1300));
        assert_eq!(prices.better.subtotal, dec!(3900));
        assert_eq!(prices.better.final_price, dec!(8666.67));
        assert_eq!(prices.best.subtotal, dec!(4800));
        assert_eq!(prices.best.final_price, dec!(10666.67));
    }

    #[test]
    fn test_final_price_has_fixed_scale() {
        let price = PricingCalculator::default()
            .price(PricingTier::Good, dec!(450), dec!(0))
            .unwrap();
        assert_eq!(price.final_price.to_string(), "1000.00");
        assert_eq!(price.subtotal.to_string(), "450");
    }

    #[test]
    fn test_midpoint_rounds_away_from_zero() {
        // 0.002025 / 0.45 = 0.0045 exactly
        let config = EngineConfig {
            price_scale: 3,
            ..EngineConfig::default()
        };
        let calc = PricingCalculator::new(&config);
        let price = calc.price(PricingTier::Good, dec!(0.002025), dec!(0)).unwrap();
        assert_eq!(price.final_price, dec!(0.005));
    }

    #[test]
    fn test_zero_totals() {
        let prices = PricingCalculator::default().price_all(dec!(0), dec!(0)).unwrap();
        for tier in PricingTier::ALL {
            assert_eq!(prices.get(tier).final_price, dec!(0));
        }
    }

    #[test]
    fn test_overflow_is_reported() {
        let err = PricingCalculator::default()
            .price(PricingTier::Best, Decimal::MAX, dec!(0))
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::PriceOverflow {
                tier: "best".into()
            }
        );
    }

    #[test]
    fn test_tier_names() {
        let names: Vec<_> = PricingTier::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(names, ["good", "better", "best"]);
    }
}
