//! Field decoders for values written by other builds or other writers.
//!
//! A field whose stored value cannot be represented reads as absent instead
//! of failing the record that holds it.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::str::FromStr;
use tracing::warn;

/// Read a JSON number or numeric string as a decimal
pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<Option<Decimal>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|value| {
        let decoded = decimal_from_value(&value);
        if decoded.is_none() && !value.is_null() {
            warn!(value = %value, "Unreadable numeric field treated as absent");
        }
        decoded
    }))
}

/// Read a JSON string, or the text of a number or boolean
pub(crate) fn string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(Value::Null) | None => None,
        Some(other) => {
            warn!(value = %other, "Unreadable text field treated as absent");
            None
        }
    })
}

/// Write whole quantities as JSON integers and fractional ones as floats
pub(crate) fn serialize_quantity<S>(quantity: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match quantity {
        Some(quantity) if quantity.fract().is_zero() => {
            if let Some(whole) = quantity.to_i64() {
                serializer.serialize_i64(whole)
            } else if let Some(whole) = quantity.to_u64() {
                serializer.serialize_u64(whole)
            } else {
                Serialize::serialize(quantity, serializer)
            }
        }
        other => other.serialize(serializer),
    }
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}
