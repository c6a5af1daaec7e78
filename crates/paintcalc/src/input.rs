//! Estimate input records and their binding to input cells

use paintcalc_core::{CellError, CellValue, Decimal, InputDecl, InputKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current version of the input record shape
pub const INPUT_VERSION: u32 = 1;

/// A raw measurement record: `{ "version": 1, "fields": {...}, "sections": [...] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimateInput {
    pub version: u32,
    #[serde(default)]
    pub fields: BTreeMap<String, InputValue>,
    /// Sections to price; `None` prices every section
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<String>>,
}

impl Default for EstimateInput {
    fn default() -> Self {
        Self::new()
    }
}

impl EstimateInput {
    pub fn new() -> Self {
        Self {
            version: INPUT_VERSION,
            fields: BTreeMap::new(),
            sections: None,
        }
    }

    pub fn from_json_str(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Set a field
    pub fn with(mut self, field: &str, value: impl Into<InputValue>) -> Self {
        self.fields.insert(field.to_string(), value.into());
        self
    }

    /// Restrict pricing to the named sections
    pub fn with_sections<I, S>(mut self, sections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sections = Some(sections.into_iter().map(Into::into).collect());
        self
    }
}

/// A field value as it arrives from the caller
///
/// JSON strings stay text even when they look numeric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputValue {
    Bool(bool),
    Text(String),
    Number(Decimal),
}

impl From<bool> for InputValue {
    fn from(b: bool) -> Self {
        InputValue::Bool(b)
    }
}

impl From<Decimal> for InputValue {
    fn from(n: Decimal) -> Self {
        InputValue::Number(n)
    }
}

impl From<i64> for InputValue {
    fn from(n: i64) -> Self {
        InputValue::Number(Decimal::from(n))
    }
}

impl From<i32> for InputValue {
    fn from(n: i32) -> Self {
        InputValue::Number(Decimal::from(n))
    }
}

impl From<&str> for InputValue {
    fn from(s: &str) -> Self {
        InputValue::Text(s.to_string())
    }
}

impl From<String> for InputValue {
    fn from(s: String) -> Self {
        InputValue::Text(s)
    }
}

/// Convert a field value into the value seeded into its input cell
///
/// A value that does not fit the declared kind becomes `#VALUE!` and
/// propagates like any other cell error.
pub fn bind(decl: &InputDecl, value: &InputValue) -> CellValue {
    match (&decl.kind, value) {
        (InputKind::Number, InputValue::Number(n)) => CellValue::Number(n.normalize()),
        (InputKind::Text, InputValue::Text(s)) => CellValue::text(s),
        (InputKind::Text, InputValue::Number(n)) => CellValue::text(n.normalize().to_string()),
        (InputKind::Boolean, InputValue::Bool(b)) => CellValue::Boolean(*b),
        (InputKind::Choice(options), InputValue::Text(s)) => {
            let wanted = s.trim();
            options
                .iter()
                .find(|option| option.eq_ignore_ascii_case(wanted))
                .map_or(CellValue::Error(CellError::Value), CellValue::text)
        }
        _ => CellValue::Error(CellError::Value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paintcalc_core::SheetCell;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn decl(kind: InputKind) -> InputDecl {
        InputDecl {
            cell: SheetCell::parse("Inputs!B2").unwrap(),
            kind,
        }
    }

    fn quality() -> InputDecl {
        decl(InputKind::Choice(vec![
            "economy".into(),
            "standard".into(),
            "premium".into(),
        ]))
    }

    #[test]
    fn test_parse_input_record() {
        let input = EstimateInput::from_json_str(
            r#"{"version": 1, "fields": {"siding_sqft": 1200.5, "paint_quality": "premium", "has_trim": true, "zip": "02134"}}"#,
        )
        .unwrap();

        assert_eq!(input.fields["siding_sqft"], InputValue::Number(dec!(1200.5)));
        assert_eq!(input.fields["paint_quality"], InputValue::Text("premium".into()));
        assert_eq!(input.fields["has_trim"], InputValue::Bool(true));
        assert_eq!(input.fields["zip"], InputValue::Text("02134".into()));
        assert_eq!(input.sections, None);
    }

    #[test]
    fn test_rejects_unknown_record_keys() {
        assert!(EstimateInput::from_json_str(r#"{"version": 1, "extra": 2}"#).is_err());
        assert!(EstimateInput::from_json_str(r#"{"fields": {}}"#).is_err());
    }

    #[test]
    fn test_builder() {
        let input = EstimateInput::new()
            .with("rooms", 4)
            .with("paint_quality", "standard")
            .with_sections(["interior"]);
        assert_eq!(input.version, INPUT_VERSION);
        assert_eq!(input.fields.len(), 2);
        assert_eq!(input.sections, Some(vec!["interior".to_string()]));
    }

    #[test]
    fn test_bind_number() {
        let number = decl(InputKind::Number);
        assert_eq!(
            bind(&number, &InputValue::Number(dec!(12.50))),
            CellValue::Number(dec!(12.5))
        );
        assert_eq!(
            bind(&number, &"12".into()),
            CellValue::Error(CellError::Value)
        );
        assert_eq!(bind(&number, &true.into()), CellValue::Error(CellError::Value));
    }

    #[test]
    fn test_bind_text_and_boolean() {
        assert_eq!(bind(&decl(InputKind::Text), &"north".into()), CellValue::text("north"));
        assert_eq!(bind(&decl(InputKind::Text), &42.into()), CellValue::text("42"));
        assert_eq!(
            bind(&decl(InputKind::Boolean), &false.into()),
            CellValue::Boolean(false)
        );
        assert_eq!(
            bind(&decl(InputKind::Boolean), &1.into()),
            CellValue::Error(CellError::Value)
        );
    }

    #[test]
    fn test_bind_choice_is_case_insensitive() {
        assert_eq!(bind(&quality(), &"Premium ".into()), CellValue::text("premium"));
        assert_eq!(
            bind(&quality(), &"deluxe".into()),
            CellValue::Error(CellError::Value)
        );
        assert_eq!(bind(&quality(), &3.into()), CellValue::Error(CellError::Value));
    }
}
