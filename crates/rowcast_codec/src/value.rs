//! Typed column values carried by change operations.

use std::fmt;

/// A nanosecond-precision instant relative to the Unix epoch.
///
/// The same representation backs naive dates, naive datetimes and UTC
/// datetimes; the [`Value`] variant says how to interpret it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Whole seconds since 1970-01-01T00:00:00.
    pub seconds: i64,
    /// Sub-second part, `0..1_000_000_000`.
    pub nanos: i32,
}

impl Timestamp {
    /// Creates a timestamp from seconds and nanoseconds.
    #[must_use]
    pub const fn new(seconds: i64, nanos: i32) -> Self {
        Self { seconds, nanos }
    }

    /// Total nanoseconds since the epoch.
    #[must_use]
    pub const fn as_nanos(self) -> i128 {
        self.seconds as i128 * 1_000_000_000 + self.nanos as i128
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// A typed column value.
///
/// `Null` is the typed NULL marker: it is emitted for NULL source values and
/// for primary keys of delete records, never a zero value of the column type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL marker.
    Null,
    /// 32-bit signed integer.
    Int(i32),
    /// 64-bit signed integer.
    Long(i64),
    /// Single precision float.
    Float(f32),
    /// Double precision float.
    Double(f64),
    /// Fixed-point number kept in its exact textual form.
    Decimal(String),
    /// UTF-8 text.
    String(String),
    /// Raw bytes.
    Binary(Vec<u8>),
    /// JSON document passed through verbatim.
    Json(String),
    /// Calendar date at midnight, no zone.
    NaiveDate(Timestamp),
    /// Instant normalized to UTC.
    UtcDatetime(Timestamp),
    /// Wall-clock datetime, no zone.
    NaiveDatetime(Timestamp),
    /// Boolean.
    Bool(bool),
}

/// Discriminant of a [`Value`], used as its tag on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Null`]
    Null,
    /// [`Value::Int`]
    Int,
    /// [`Value::Long`]
    Long,
    /// [`Value::Float`]
    Float,
    /// [`Value::Double`]
    Double,
    /// [`Value::Decimal`]
    Decimal,
    /// [`Value::String`]
    String,
    /// [`Value::Binary`]
    Binary,
    /// [`Value::Json`]
    Json,
    /// [`Value::NaiveDate`]
    NaiveDate,
    /// [`Value::UtcDatetime`]
    UtcDatetime,
    /// [`Value::NaiveDatetime`]
    NaiveDatetime,
    /// [`Value::Bool`]
    Bool,
}

impl ValueKind {
    /// Converts to the numeric tag used in the CBOR encoding.
    pub fn to_code(self) -> u8 {
        match self {
            ValueKind::Null => 0,
            ValueKind::Int => 1,
            ValueKind::Long => 2,
            ValueKind::Float => 3,
            ValueKind::Double => 4,
            ValueKind::Decimal => 5,
            ValueKind::String => 6,
            ValueKind::Binary => 7,
            ValueKind::Json => 8,
            ValueKind::NaiveDate => 9,
            ValueKind::UtcDatetime => 10,
            ValueKind::NaiveDatetime => 11,
            ValueKind::Bool => 12,
        }
    }

    /// Converts from a numeric tag.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(ValueKind::Null),
            1 => Some(ValueKind::Int),
            2 => Some(ValueKind::Long),
            3 => Some(ValueKind::Float),
            4 => Some(ValueKind::Double),
            5 => Some(ValueKind::Decimal),
            6 => Some(ValueKind::String),
            7 => Some(ValueKind::Binary),
            8 => Some(ValueKind::Json),
            9 => Some(ValueKind::NaiveDate),
            10 => Some(ValueKind::UtcDatetime),
            11 => Some(ValueKind::NaiveDatetime),
            12 => Some(ValueKind::Bool),
            _ => None,
        }
    }
}

impl Value {
    /// Returns the discriminant of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::Json(_) => ValueKind::Json,
            Value::NaiveDate(_) => ValueKind::NaiveDate,
            Value::UtcDatetime(_) => ValueKind::UtcDatetime,
            Value::NaiveDatetime(_) => ValueKind::NaiveDatetime,
            Value::Bool(_) => ValueKind::Bool,
        }
    }

    /// Check if this value is the NULL marker.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get this value as a 32-bit integer, if it is one.
    pub fn as_int(&self) -> Option<i32> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a 64-bit integer, if it is one.
    pub fn as_long(&self) -> Option<i64> {
        match self {
            Value::Long(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a single precision float, if it is one.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Get this value as a double precision float, if it is one.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the textual form of a decimal value.
    pub fn as_decimal(&self) -> Option<&str> {
        match self {
            Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a string, if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as bytes, if it is binary.
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    /// Get the raw JSON payload, if this is a JSON value.
    pub fn as_json(&self) -> Option<&str> {
        match self {
            Value::Json(s) => Some(s),
            _ => None,
        }
    }

    /// Get this value as a boolean, if it is one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the timestamp of a naive date.
    pub fn as_naive_date(&self) -> Option<Timestamp> {
        match self {
            Value::NaiveDate(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Get the timestamp of a UTC datetime.
    pub fn as_utc_datetime(&self) -> Option<Timestamp> {
        match self {
            Value::UtcDatetime(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Get the timestamp of a naive datetime.
    pub fn as_naive_datetime(&self) -> Option<Timestamp> {
        match self {
            Value::NaiveDatetime(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<f32> for Value {
    fn from(n: f32) -> Self {
        Value::Float(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Double(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Binary(b)
    }
}
