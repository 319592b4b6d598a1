//! Opaque structured metadata attached to commodities.
//!
//! The ledger never interprets these values, it only has to hand them back
//! exactly as they were given. Maps are kept in a `BTreeMap` so the encoded
//! bytes do not depend on insertion order.
use super::error::{LedgerError, Result};
use std::collections::BTreeMap;

#[derive(
    Debug,
    Clone,
    PartialEq,
    Default,
    minicbor::Encode,
    minicbor::Decode,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(untagged)]
pub enum Metadata {
    #[default]
    #[n(0)]
    Null,
    #[n(1)]
    Bool(#[n(0)] bool),
    #[n(2)]
    Int(#[n(0)] i64),
    // integers above i64::MAX, tried before Float so they stay exact
    #[n(7)]
    UInt(#[n(0)] u64),
    #[n(3)]
    Float(#[n(0)] f64),
    #[n(4)]
    Text(#[n(0)] String),
    #[n(5)]
    List(#[n(0)] Vec<Metadata>),
    #[n(6)]
    Map(#[n(0)] BTreeMap<String, Metadata>),
}

impl Metadata {
    /// Parse caller supplied JSON. An empty string means "no metadata".
    pub fn parse_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Metadata::Null);
        }
        serde_json::from_str(raw)
            .map_err(|e| LedgerError::invalid(format!("failed to parse metadata: {e}")))
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Metadata::Null)
    }
    /// Field lookup for map values.
    pub fn get(&self, key: &str) -> Option<&Metadata> {
        match self {
            Metadata::Map(map) => map.get(key),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_json() {
        let meta =
            Metadata::parse_json(r#"{"imageUrl": "/images/gold.png", "tags": [1, 2.5, true, null]}"#)
                .unwrap();

        assert_eq!(
            meta.get("imageUrl"),
            Some(&Metadata::Text("/images/gold.png".into()))
        );
        assert_eq!(
            meta.get("tags"),
            Some(&Metadata::List(vec![
                Metadata::Int(1),
                Metadata::Float(2.5),
                Metadata::Bool(true),
                Metadata::Null,
            ]))
        );
    }

    #[test]
    fn empty_input_is_null() {
        assert!(Metadata::parse_json("").unwrap().is_null());
        assert!(Metadata::parse_json("   ").unwrap().is_null());
    }

    #[test]
    fn malformed_json_is_invalid_argument() {
        let err = Metadata::parse_json("{not json").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidArgument);
    }

    #[test]
    fn survives_storage_and_json_output() {
        let meta = Metadata::parse_json(r#"{"b": {"x": -3}, "a": "first"}"#).unwrap();

        let encoded = minicbor::to_vec(&meta).unwrap();
        let decoded: Metadata = minicbor::decode(&encoded).unwrap();
        assert_eq!(meta, decoded);

        // keys come back sorted regardless of input order
        let json = serde_json::to_string(&decoded).unwrap();
        assert_eq!(json, r#"{"a":"first","b":{"x":-3}}"#);
    }

    #[test]
    fn large_unsigned_integers_stay_exact() {
        let meta = Metadata::parse_json(r#"{"supply": 18446744073709551615, "small": 7}"#).unwrap();
        assert_eq!(meta.get("supply"), Some(&Metadata::UInt(u64::MAX)));
        assert_eq!(meta.get("small"), Some(&Metadata::Int(7)));

        let decoded: Metadata = minicbor::decode(&minicbor::to_vec(&meta).unwrap()).unwrap();
        assert_eq!(decoded, meta);
        assert_eq!(
            serde_json::to_string(&decoded).unwrap(),
            r#"{"small":7,"supply":18446744073709551615}"#
        );
    }
}
