//! Engine configuration
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid
//! configuration.

use crate::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Options for pricing and caching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Every tier subtotal is divided by this (default: 0.45)
    pub markup_divisor: Decimal,
    pub tiers: TierMultipliers,
    /// Decimal places of the final price (default: 2)
    pub price_scale: u32,
    pub cache: CacheConfig,
    /// Highest `EstimateInput` version accepted (default: 1)
    pub max_input_version: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            markup_divisor: Decimal::new(45, 2),
            tiers: TierMultipliers::default(),
            price_scale: 2,
            cache: CacheConfig::default(),
            max_input_version: 1,
        }
    }
}

/// Multipliers applied to labor and material for each tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TierMultipliers {
    pub good: Decimal,
    pub better: Decimal,
    pub best: Decimal,
}

impl Default for TierMultipliers {
    fn default() -> Self {
        Self {
            good: Decimal::ONE,
            better: Decimal::new(13, 1),
            best: Decimal::new(16, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub enabled: bool,
    /// How long a computed result stays valid (default: 900)
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 900,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Check the invariants the pricing calculator relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.markup_divisor <= Decimal::ZERO {
            return Err(ConfigError::InvalidDivisor(self.markup_divisor));
        }

        let tiers = [
            ("good", self.tiers.good),
            ("better", self.tiers.better),
            ("best", self.tiers.best),
        ];
        for (tier, value) in tiers {
            if value < Decimal::ZERO {
                return Err(ConfigError::NegativeMultiplier {
                    tier: tier.to_string(),
                    value,
                });
            }
        }
        if self.tiers.good > self.tiers.better || self.tiers.better > self.tiers.best {
            return Err(ConfigError::DecreasingMultipliers);
        }

        if self.price_scale > 28 {
            return Err(ConfigError::InvalidPriceScale(self.price_scale));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidTtl);
        }
        Ok(())
    }
}
