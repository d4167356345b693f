//! Tolerant field decoders for the racing feed.
//!
//! The upstream feed is not consistent about scalar types: the same field may arrive as a string,
//! a number, a boolean or `null` depending on the endpoint. Each decoder here accepts any JSON
//! value and maps whatever it cannot interpret to `None` rather than failing the enclosing record.

use serde::de;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Deserializer};
use serde_json::{Number, Value};
use tracing::trace;

#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Str(String),
    Num(Number),
    Bool(bool),
    Other(#[allow(dead_code)] IgnoredAny),
}

/// A string, or a number coerced to its string form. Empty strings are retained. A number keeps
/// its JSON form, so `14.0` stays `"14.0"`.
pub fn opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Str(s) => Some(s),
        Scalar::Num(n) => Some(n.to_string()),
        Scalar::Bool(_) | Scalar::Other(_) => None,
    })
}

/// As [opt_string], but the field must be present and scalar.
pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    opt_string(deserializer)?.ok_or_else(|| de::Error::custom("expected a string or a number"))
}

/// As [opt_string], substituting an empty string for anything else.
pub fn string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(opt_string(deserializer)?.unwrap_or_default())
}

/// A boolean, also accepting numbers (non-zero is `true`) and the strings
/// `"true"`/`"false"`/`"1"`/`"0"`.
pub fn opt_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Bool(b) => Some(b),
        Scalar::Num(n) => n.as_f64().map(|value| value != 0.0),
        Scalar::Str(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" | "" => Some(false),
            _ => None,
        },
        Scalar::Other(_) => None,
    })
}

/// A sequence in which `null` or a non-array is an empty sequence and each element that fails to
/// decode is `None`. Element positions are preserved, so parallel sequences stay aligned.
pub fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(lenient_value).collect(),
        other => {
            if !other.is_null() {
                trace!("expected a sequence, got {other}");
            }
            vec![]
        }
    })
}

/// As [lenient_seq], but drops elements that did not decode.
pub fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let items: Vec<Option<T>> = lenient_seq(deserializer)?;
    Ok(items.into_iter().flatten().collect())
}

/// A nested record that is `None` unless it decodes completely.
pub fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_value(Value::deserialize(deserializer)?))
}

/// Any JSON value, defaulting to `Null` for absent fields. Used for pass-through tables.
pub fn lenient_values<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        _ => vec![],
    })
}

fn lenient_value<T: DeserializeOwned>(value: Value) -> Option<T> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            trace!("discarding malformed record: {err}");
            None
        }
    }
}

/// Parses a decimal that may use a comma as its decimal separator. Blank or unparseable input is
/// absent, never zero.
pub fn parse_decimal(s: &str) -> Option<f64> {
    let normalised = s.trim().replace(',', ".");
    if normalised.is_empty() {
        return None;
    }
    normalised.parse::<f64>().ok().filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_float_eq::*;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Fields {
        #[serde(default, deserialize_with = "opt_string")]
        text: Option<String>,
        #[serde(default, deserialize_with = "opt_bool")]
        flag: Option<bool>,
    }

    fn fields(json: &str) -> Fields {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn opt_string_coerces_numbers() {
        assert_eq!(Some("2.5".into()), fields(r#"{"text": 2.5}"#).text);
        assert_eq!(Some("7".into()), fields(r#"{"text": 7}"#).text);
        assert_eq!(Some("14.0".into()), fields(r#"{"text": 14.0}"#).text);
        assert_eq!(Some("K".into()), fields(r#"{"text": "K"}"#).text);
        assert_eq!(None, fields(r#"{"text": null}"#).text);
        assert_eq!(None, fields(r#"{"text": [1, 2]}"#).text);
        assert_eq!(None, fields(r#"{}"#).text);
    }

    #[test]
    fn opt_bool_accepts_loose_forms() {
        assert_eq!(Some(true), fields(r#"{"flag": true}"#).flag);
        assert_eq!(Some(true), fields(r#"{"flag": 1}"#).flag);
        assert_eq!(Some(true), fields(r#"{"flag": 1.0}"#).flag);
        assert_eq!(Some(false), fields(r#"{"flag": 0.0}"#).flag);
        assert_eq!(Some(false), fields(r#"{"flag": "0"}"#).flag);
        assert_eq!(Some(true), fields(r#"{"flag": "TRUE"}"#).flag);
        assert_eq!(None, fields(r#"{"flag": "maybe"}"#).flag);
        assert_eq!(None, fields(r#"{"flag": {"x": 1}}"#).flag);
    }

    #[test]
    fn lenient_seq_preserves_positions() {
        #[derive(Debug, Deserialize)]
        struct Holder {
            #[serde(default, deserialize_with = "lenient_seq")]
            items: Vec<Option<u32>>,
        }
        let holder: Holder = serde_json::from_str(r#"{"items": [1, null, "x", 4]}"#).unwrap();
        assert_eq!(vec![Some(1), None, None, Some(4)], holder.items);

        let holder: Holder = serde_json::from_str(r#"{"items": null}"#).unwrap();
        assert!(holder.items.is_empty());

        let holder: Holder = serde_json::from_str(r#"{"items": "oops"}"#).unwrap();
        assert!(holder.items.is_empty());
    }

    #[test]
    fn parse_decimal_with_comma() {
        assert_float_absolute_eq!(12.5, parse_decimal("12,5").unwrap(), 1e-9);
        assert_float_absolute_eq!(60.0, parse_decimal(" 60 ").unwrap(), 1e-9);
        assert_eq!(None, parse_decimal(""));
        assert_eq!(None, parse_decimal("-"));
        assert_eq!(None, parse_decimal("abc"));
    }
}
