//! Decimal-safe JSON encoding and decoding.
//!
//! Payloads and responses are [`serde_json::Value`] trees. The codec runs in
//! two modes:
//!
//! - *Decimal-unaware*: plain JSON. Numbers that cannot round-trip
//!   losslessly through i64/u64/f64 are rejected at encode time, and every
//!   number in a decoded response is normalized to its ordinary
//!   i64/u64/f64-backed representation.
//! - *Decimal-aware*: arbitrary-precision numbers keep their exact literal
//!   text through a full encode/decode cycle. This crate builds
//!   `serde_json` with the `arbitrary_precision` feature, so a
//!   [`rust_decimal::Decimal`] enters a payload through [`decimal_to_value`]
//!   as a true JSON number (never a float, never a string) and is recovered
//!   from a response number through [`number_to_decimal`] without precision
//!   loss.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

/// Embeds an arbitrary-precision decimal in a payload as a JSON number.
///
/// The number carries the decimal's exact text (trailing zeros included),
/// which survives encoding verbatim.
pub fn decimal_to_value(decimal: &Decimal) -> Value {
    // a Decimal always displays as a valid JSON number literal
    let number = serde_json::from_str::<Number>(&decimal.to_string())
        .expect("decimal display is a valid JSON number");
    Value::Number(number)
}

/// Recovers an arbitrary-precision decimal from a JSON number.
///
/// Handles both plain literals (`123.45`) and scientific notation (`1.2e3`).
pub fn number_to_decimal(number: &Number) -> Result<Decimal> {
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| Error::Serialization(format!("number '{text}' does not fit a decimal: {e}")))
}

/// Serializes a payload to JSON text.
///
/// `None` (no payload, e.g. GET requests) encodes to `None`. In
/// decimal-unaware mode, any number that would lose precision through an
/// ordinary float representation is rejected with
/// [`Error::Serialization`] before any network activity.
pub fn encode_payload(payload: Option<&Value>, decimal_aware: bool) -> Result<Option<String>> {
    let payload = match payload {
        None => return Ok(None),
        Some(payload) => payload,
    };
    if !decimal_aware {
        ensure_plain_numbers(payload)?;
    }
    serde_json::to_string(payload)
        .map(Some)
        .map_err(|e| Error::Serialization(e.to_string()))
}

/// Parses JSON response text.
///
/// In decimal-aware mode, numbers keep their exact literal text (recover
/// them with [`number_to_decimal`]); otherwise they are normalized to
/// ordinary i64/u64/f64 values.
pub fn parse_response(text: &str, decimal_aware: bool) -> serde_json::Result<Value> {
    let parsed: Value = serde_json::from_str(text)?;
    if decimal_aware {
        Ok(parsed)
    } else {
        Ok(normalize_numbers(parsed))
    }
}

/// A number is "plain" when its literal text round-trips exactly through
/// the ordinary i64/u64/f64 representations.
fn is_plain_number(number: &Number) -> bool {
    if number.is_i64() || number.is_u64() {
        return true;
    }
    let text = number.to_string();
    match text.parse::<f64>() {
        Ok(float) if float.is_finite() => Number::from_f64(float)
            .map(|roundtrip| roundtrip.to_string() == text)
            .unwrap_or(false),
        _ => false,
    }
}

fn ensure_plain_numbers(value: &Value) -> Result<()> {
    match value {
        Value::Number(number) if !is_plain_number(number) => Err(Error::Serialization(format!(
            "number '{number}' exceeds float precision; this payload requires decimal-aware encoding"
        ))),
        Value::Array(items) => items.iter().try_for_each(ensure_plain_numbers),
        Value::Object(fields) => fields.values().try_for_each(ensure_plain_numbers),
        _ => Ok(()),
    }
}

fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(number) => {
            let normalized = if let Some(i) = number.as_i64() {
                Some(Number::from(i))
            } else if let Some(u) = number.as_u64() {
                Some(Number::from(u))
            } else {
                number.as_f64().and_then(Number::from_f64)
            };
            Value::Number(normalized.unwrap_or(number))
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .into_iter()
                .map(|(k, v)| (k, normalize_numbers(v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}
