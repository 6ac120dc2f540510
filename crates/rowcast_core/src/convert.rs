//! Conversion of raw driver values into output values.
//!
//! The wire type decides how the payload is parsed, the declared type from
//! the catalog decides the shape of the result. A few rules cross over:
//!
//! - tiny integers declared `BOOLEAN` become booleans when
//!   [`SerializerConfig::tiny_int_as_bool`] is set,
//! - `BIT` columns declared `BOOLEAN` become booleans,
//! - temporal declared types re-shape temporal wires.
//!
//! Conversion never loses precision: a value that does not fit the target
//! shape is an error, not a truncation.

use crate::catalog::DataType;
use crate::config::SerializerConfig;
use crate::error::{SerializeError, SerializeResult};
use crate::wire::{Charset, Field, RawValue, WireType};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Utc};
use rowcast_codec::{Timestamp, Value};
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

const DATE_FORMAT: &str = "%Y-%m-%d";
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const ZERO_DATE: &str = "0000-00-00";

/// Output shape of a temporal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Temporal {
    Date,
    Utc,
    Naive,
}

/// Converts raw values to [`Value`]s.
#[derive(Debug, Clone)]
pub struct TypeConverter {
    tiny_int_as_bool: bool,
    source_offset: FixedOffset,
}

impl Default for TypeConverter {
    fn default() -> Self {
        Self::new(&SerializerConfig::default())
    }
}

impl TypeConverter {
    /// Creates a converter for the given configuration.
    ///
    /// An offset outside ±24h is replaced by UTC.
    pub fn new(config: &SerializerConfig) -> Self {
        let source_offset = FixedOffset::east_opt(config.source_utc_offset).unwrap_or_else(|| {
            warn!(
                offset = config.source_utc_offset,
                "source UTC offset out of range, using UTC"
            );
            Utc.fix()
        });
        Self {
            tiny_int_as_bool: config.tiny_int_as_bool,
            source_offset,
        }
    }

    /// Converts one raw value.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedWireType` for query-only wire types carrying a
    /// payload, and `Conversion` for payloads that cannot be parsed or do
    /// not fit the declared type.
    pub fn convert(
        &self,
        field: &Field,
        raw: &RawValue,
        declared: DataType,
    ) -> SerializeResult<Value> {
        let Some(bytes) = raw.as_bytes() else {
            return Ok(Value::Null);
        };
        let wire = field.wire_type;
        let fail = |message: String| {
            SerializeError::conversion(field.name.as_str(), wire, declared, message)
        };

        match wire {
            WireType::Int8
            | WireType::Uint8
            | WireType::Int16
            | WireType::Uint16
            | WireType::Int24
            | WireType::Uint24
            | WireType::Int32
            | WireType::Uint32
            | WireType::Int64
            | WireType::Uint64
            | WireType::Year => ascii(bytes)
                .and_then(|text| self.integral(wire, text, declared))
                .map_err(fail),
            WireType::Float32 | WireType::Float64 => ascii(bytes)
                .and_then(|text| floating(wire, text, declared))
                .map_err(fail),
            WireType::Decimal => ascii(bytes)
                .and_then(|text| match declared {
                    DataType::String => Ok(Value::String(text.to_string())),
                    DataType::Float => parse_f32(text).map(Value::Float),
                    DataType::Double => parse_f64(text).map(Value::Double),
                    _ => decimal(text),
                })
                .map_err(fail),
            WireType::Varchar
            | WireType::Char
            | WireType::Text
            | WireType::Enum
            | WireType::Set
            | WireType::Time => {
                let text = Charset::from_id(field.charset).decode(bytes).map_err(fail)?;
                Ok(match declared {
                    DataType::Json => Value::Json(text),
                    _ => Value::String(text),
                })
            }
            WireType::Binary | WireType::Varbinary | WireType::Blob | WireType::Geometry => {
                Ok(Value::Binary(bytes.to_vec()))
            }
            WireType::Bit => Ok(match declared {
                DataType::Boolean => Value::Bool(bytes.iter().any(|&b| b != 0)),
                _ => Value::Binary(bytes.to_vec()),
            }),
            WireType::Json => std::str::from_utf8(bytes)
                .map(|text| Value::Json(text.to_string()))
                .map_err(|e| fail(e.to_string())),
            WireType::Date | WireType::Datetime | WireType::Timestamp => ascii(bytes)
                .and_then(|text| self.temporal(wire, text, declared))
                .map_err(fail),
            WireType::NullType
            | WireType::Tuple
            | WireType::Expression
            | WireType::HexNum
            | WireType::HexVal
            | WireType::BitNum => Err(SerializeError::UnsupportedWireType {
                column: field.name.clone(),
                code: wire.to_code(),
            }),
        }
    }

    fn integral(&self, wire: WireType, text: &str, declared: DataType) -> Result<Value, String> {
        match declared {
            DataType::Boolean
                if self.tiny_int_as_bool && matches!(wire, WireType::Int8 | WireType::Uint8) =>
            {
                parse::<i64>(text).map(|n| Value::Bool(n != 0))
            }
            DataType::Int => parse::<i32>(text).map(Value::Int),
            DataType::Long => parse::<i64>(text).map(Value::Long),
            DataType::Float => parse_f32(text).map(Value::Float),
            DataType::Double => parse_f64(text).map(Value::Double),
            DataType::Decimal => decimal(text),
            DataType::String => Ok(Value::String(text.to_string())),
            _ => match wire {
                WireType::Uint32 | WireType::Int64 | WireType::Uint64 => {
                    parse::<i64>(text).map(Value::Long)
                }
                _ => parse::<i32>(text).map(Value::Int),
            },
        }
    }

    fn temporal(&self, wire: WireType, text: &str, declared: DataType) -> Result<Value, String> {
        if text.starts_with(ZERO_DATE) {
            return Ok(Value::Null);
        }

        let naive = match wire {
            WireType::Date => NaiveDate::parse_from_str(text, DATE_FORMAT)
                .map_err(|e| e.to_string())?
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| "invalid midnight".to_string())?,
            _ => parse_datetime(text)?,
        };

        let shape = match declared {
            DataType::NaiveDate => Temporal::Date,
            DataType::UtcDatetime => Temporal::Utc,
            DataType::NaiveDatetime => Temporal::Naive,
            _ => match wire {
                WireType::Date => Temporal::Date,
                WireType::Timestamp => Temporal::Utc,
                _ => Temporal::Naive,
            },
        };

        Ok(match shape {
            Temporal::Date => {
                let midnight = naive.date().and_hms_opt(0, 0, 0).unwrap_or(naive);
                Value::NaiveDate(timestamp(&Utc.from_utc_datetime(&midnight)))
            }
            Temporal::Naive => Value::NaiveDatetime(timestamp(&Utc.from_utc_datetime(&naive))),
            // Only TIMESTAMP columns are stored in the session zone.
            Temporal::Utc if wire == WireType::Timestamp => {
                let local = self
                    .source_offset
                    .from_local_datetime(&naive)
                    .single()
                    .ok_or_else(|| format!("{text} does not exist in the source time zone"))?;
                Value::UtcDatetime(timestamp(&local.with_timezone(&Utc)))
            }
            Temporal::Utc => Value::UtcDatetime(timestamp(&Utc.from_utc_datetime(&naive))),
        })
    }
}

fn floating(wire: WireType, text: &str, declared: DataType) -> Result<Value, String> {
    match declared {
        DataType::Float => parse_f32(text).map(Value::Float),
        DataType::Double => parse_f64(text).map(Value::Double),
        DataType::Decimal => decimal(text),
        DataType::String => Ok(Value::String(text.to_string())),
        _ if wire == WireType::Float32 => parse_f32(text).map(Value::Float),
        _ => parse_f64(text).map(Value::Double),
    }
}

fn ascii(bytes: &[u8]) -> Result<&str, String> {
    if !bytes.is_ascii() {
        return Err("non-ASCII byte in numeric payload".to_string());
    }
    std::str::from_utf8(bytes).map_err(|e| e.to_string())
}

fn parse<T>(text: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    text.parse::<T>().map_err(|e| format!("{text:?}: {e}"))
}

fn parse_f32(text: &str) -> Result<f32, String> {
    let n = parse::<f32>(text)?;
    if n.is_finite() || is_infinity_literal(text) {
        Ok(n)
    } else {
        Err(format!("{text:?} is out of range for FLOAT"))
    }
}

fn parse_f64(text: &str) -> Result<f64, String> {
    let n = parse::<f64>(text)?;
    if n.is_finite() || is_infinity_literal(text) {
        Ok(n)
    } else {
        Err(format!("{text:?} is out of range for DOUBLE"))
    }
}

fn is_infinity_literal(text: &str) -> bool {
    let unsigned = text.trim_start_matches(|c: char| c == '+' || c == '-');
    unsigned.eq_ignore_ascii_case("inf") || unsigned.eq_ignore_ascii_case("infinity")
}

fn decimal(text: &str) -> Result<Value, String> {
    if is_decimal_literal(text) {
        Ok(Value::Decimal(text.to_string()))
    } else {
        Err(format!("{text:?} is not a decimal literal"))
    }
}

/// `[+-]digits[.digits]`, with at least one digit on either side of the dot.
fn is_decimal_literal(text: &str) -> bool {
    let unsigned = text
        .strip_prefix(|c: char| c == '+' || c == '-')
        .unwrap_or(text);
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(whole.is_empty() && fraction.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

fn parse_datetime(text: &str) -> Result<NaiveDateTime, String> {
    let mut last_error = None;
    for format in DATETIME_FORMATS {
        match NaiveDateTime::parse_from_str(text, format) {
            Ok(value) => return Ok(value),
            Err(e) => last_error = Some(e),
        }
    }
    // A DATETIME column may still carry a bare date.
    if let Ok(date) = NaiveDate::parse_from_str(text, DATE_FORMAT) {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight);
        }
    }
    Err(match last_error {
        Some(e) => format!("{text:?}: {e}"),
        None => format!("{text:?} is not a datetime"),
    })
}

fn timestamp<Tz: TimeZone>(instant: &DateTime<Tz>) -> Timestamp {
    // Leap seconds report up to 1_999_999_999 nanos.
    let nanos = instant.timestamp_subsec_nanos().min(999_999_999);
    Timestamp::new(instant.timestamp(), nanos as i32)
}
