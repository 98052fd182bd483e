//! Wire timestamp codec.
//!
//! The remote service encodes message times as 13 decimal digits: ten digits of UNIX
//! seconds followed by a three digit suffix the server uses to order messages sent within
//! the same second. Internally we keep `seconds.suffix` as an `f64` so that ordering and
//! comparison are plain float comparisons.

use crate::domain::DomainError;

/// Length of an encoded wire timestamp.
pub const WIRE_LEN: usize = 13;

const SECONDS_LEN: usize = 10;

/// Decode a 13-digit wire timestamp into seconds since epoch.
pub fn decode(wire: &str) -> Result<f64, DomainError> {
    let wire = wire.trim();
    if wire.len() != WIRE_LEN || !wire.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DomainError::InvalidTimestamp(format!(
            "expected {} digits, got {:?}",
            WIRE_LEN, wire
        )));
    }
    let (seconds, suffix) = wire.split_at(SECONDS_LEN);
    format!("{}.{}", seconds, suffix)
        .parse::<f64>()
        .map_err(|e| DomainError::InvalidTimestamp(format!("{:?}: {}", wire, e)))
}

/// Decode a timestamp as it appears in a JSON body. Strings and integers are wire encoded;
/// a float is already in seconds and is returned unchanged.
pub fn decode_value(value: &serde_json::Value) -> Result<f64, DomainError> {
    match value {
        serde_json::Value::String(s) => decode(s),
        serde_json::Value::Number(n) if n.is_f64() => n
            .as_f64()
            .ok_or_else(|| DomainError::InvalidTimestamp(n.to_string())),
        serde_json::Value::Number(n) => decode(&n.to_string()),
        other => Err(DomainError::InvalidTimestamp(format!(
            "unexpected JSON value {}",
            other
        ))),
    }
}

/// Encode seconds since epoch into the 13-digit wire form: the integer part left-padded with
/// zeros to ten digits, then the fraction cut or right-padded with zeros to three.
///
/// Any value in `[0, 1e10)` is encodable, so every decodable wire string round-trips,
/// including ones with leading zeros.
pub fn encode(seconds: f64) -> Result<String, DomainError> {
    // Eleven integer digits would shift the suffix into the seconds field.
    if !seconds.is_finite() || !(0.0..1e10).contains(&seconds) {
        return Err(DomainError::InvalidTimestamp(format!(
            "{} is not encodable as a wire timestamp",
            seconds
        )));
    }
    let text = seconds.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let mut digits = format!("{:0>width$}{}", whole, fraction, width = SECONDS_LEN);
    digits.truncate(WIRE_LEN);
    while digits.len() < WIRE_LEN {
        digits.push('0');
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decode_splits_seconds_and_suffix() {
        assert_eq!(decode("1500000000123").unwrap(), 1_500_000_000.123);
        assert_eq!(decode("1500000000000").unwrap(), 1_500_000_000.0);
    }

    #[test]
    fn round_trip_well_formed() {
        for wire in [
            "1500000000123",
            "1500000000120",
            "1500000000100",
            "1500000000001",
            "1500000000000",
            "1699999999999",
        ] {
            let secs = decode(wire).unwrap();
            assert_eq!(encode(secs).unwrap(), wire, "round trip of {}", wire);
        }
    }

    #[test]
    fn suffix_orders_within_a_second() {
        let a = decode("1500000000009").unwrap();
        let b = decode("1500000000010").unwrap();
        assert!(a < b);
    }

    #[test]
    fn malformed_input_is_rejected_not_padded() {
        assert!(matches!(
            decode("150000000"),
            Err(DomainError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            decode("15000000001234"),
            Err(DomainError::InvalidTimestamp(_))
        ));
        assert!(matches!(
            decode("15000000a0123"),
            Err(DomainError::InvalidTimestamp(_))
        ));
        assert!(matches!(decode(""), Err(DomainError::InvalidTimestamp(_))));
    }

    #[test]
    fn decode_value_accepts_string_integer_and_float() {
        assert_eq!(
            decode_value(&json!("1500000000123")).unwrap(),
            1_500_000_000.123
        );
        assert_eq!(
            decode_value(&json!(1500000000123_u64)).unwrap(),
            1_500_000_000.123
        );
        assert_eq!(
            decode_value(&json!(1_500_000_000.5)).unwrap(),
            1_500_000_000.5
        );
        assert!(decode_value(&json!(null)).is_err());
    }

    #[test]
    fn encode_pads_short_fractions() {
        assert_eq!(encode(1_500_000_000.5).unwrap(), "1500000000500");
        assert_eq!(encode(1_500_000_000.0).unwrap(), "1500000000000");
    }

    #[test]
    fn encode_rejects_out_of_range() {
        assert!(encode(f64::NAN).is_err());
        assert!(encode(-1.0).is_err());
        assert!(encode(1e10).is_err());
        assert!(encode(f64::INFINITY).is_err());
    }

    #[test]
    fn leading_zero_wire_values_round_trip() {
        for wire in ["0999999999123", "0000000150000", "0000000000001"] {
            let secs = decode(wire).unwrap();
            assert_eq!(encode(secs).unwrap(), wire, "round trip of {}", wire);
        }
        assert_eq!(encode(150.25).unwrap(), "0000000150250");
    }
}
