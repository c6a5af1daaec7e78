//! Input fingerprints for the result cache

use crate::input::{EstimateInput, InputValue};
use serde::{Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fmt;

/// SHA-256 of a normalized estimate input, salted with the workbook identity
///
/// Two inputs that differ only in field order, trailing decimal zeros or
/// the order of selected sections share a fingerprint.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint `input` as evaluated against the workbook `identity`
    pub fn compute(identity: &str, input: &EstimateInput) -> Self {
        let mut hasher = Sha256::new();
        write_str(&mut hasher, identity);
        hasher.update(input.version.to_be_bytes());

        // BTreeMap iterates in key order
        hasher.update((input.fields.len() as u64).to_be_bytes());
        for (name, value) in &input.fields {
            write_str(&mut hasher, name);
            match value {
                InputValue::Bool(b) => hasher.update([b'b', u8::from(*b)]),
                InputValue::Number(n) => {
                    hasher.update([b'n']);
                    write_str(&mut hasher, &n.normalize().to_string());
                }
                InputValue::Text(s) => {
                    hasher.update([b't']);
                    write_str(&mut hasher, s);
                }
            }
        }

        match &input.sections {
            None => hasher.update([0u8]),
            Some(sections) => {
                let sorted: BTreeSet<&str> = sections.iter().map(String::as_str).collect();
                hasher.update([1u8]);
                hasher.update((sorted.len() as u64).to_be_bytes());
                for section in sorted {
                    write_str(&mut hasher, section);
                }
            }
        }

        Fingerprint(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Length-prefixed so adjacent strings cannot run together
fn write_str(hasher: &mut Sha256, s: &str) {
    hasher.update((s.len() as u64).to_be_bytes());
    hasher.update(s.as_bytes());
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};
    use rust_decimal_macros::dec;

    const WORKBOOK: &str = "estimator@3.20";

    #[test]
    fn test_normalization() {
        let a = EstimateInput::new()
            .with("siding_sqft", dec!(1200.50))
            .with("paint_quality", "standard")
            .with_sections(["exterior", "interior"]);
        let b = EstimateInput::new()
            .with("paint_quality", "standard")
            .with("siding_sqft", dec!(1200.5))
            .with_sections(["interior", "exterior", "interior"]);

        assert_eq!(Fingerprint::compute(WORKBOOK, &a), Fingerprint::compute(WORKBOOK, &b));
    }

    #[test]
    fn test_distinguishes_inputs() {
        let base = EstimateInput::new().with("rooms", 4);
        let fp = Fingerprint::compute(WORKBOOK, &base);

        assert_ne!(fp, Fingerprint::compute("estimator@3.21", &base));
        assert_ne!(fp, Fingerprint::compute(WORKBOOK, &base.clone().with("rooms", 5)));
        assert_ne!(fp, Fingerprint::compute(WORKBOOK, &EstimateInput::new().with("rooms", "4")));
        assert_ne!(fp, Fingerprint::compute(WORKBOOK, &base.clone().with_sections(["interior"])));
        assert_ne!(
            Fingerprint::compute(WORKBOOK, &base.clone().with_sections(Vec::<String>::new())),
            fp
        );
    }

    #[test]
    fn test_length_prefix_prevents_collisions() {
        let a = EstimateInput::new().with("ab", "c");
        let b = EstimateInput::new().with("a", "bc");
        assert_ne!(Fingerprint::compute(WORKBOOK, &a), Fingerprint::compute(WORKBOOK, &b));
    }

    #[test]
    fn test_hex_and_serialize() {
        let fp = Fingerprint::compute(WORKBOOK, &EstimateInput::new());
        let hex = fp.to_hex();
        assert_eq!(hex.len(), 64);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(serde_json::to_string(&fp).unwrap(), format!("\"{}\"", hex));
    }
}
