//! Raw rows as reported by the database driver.
//!
//! Values arrive in the MySQL text protocol encoding: integers and floats
//! as ASCII digits, temporal values as `YYYY-MM-DD[ hh:mm:ss[.ffffff]]`,
//! everything else as the column's bytes.

use crate::error::{SerializeError, SerializeResult};
use bytes::Bytes;
use std::fmt;

/// Column type tag reported by the driver.
///
/// Codes follow the Vitess `query.Type` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    /// NULL literal.
    NullType,
    /// Signed 8-bit integer.
    Int8,
    /// Unsigned 8-bit integer.
    Uint8,
    /// Signed 16-bit integer.
    Int16,
    /// Unsigned 16-bit integer.
    Uint16,
    /// Signed 24-bit integer.
    Int24,
    /// Unsigned 24-bit integer.
    Uint24,
    /// Signed 32-bit integer.
    Int32,
    /// Unsigned 32-bit integer.
    Uint32,
    /// Signed 64-bit integer.
    Int64,
    /// Unsigned 64-bit integer.
    Uint64,
    /// Single precision float.
    Float32,
    /// Double precision float.
    Float64,
    /// Timestamp, stored in the session time zone.
    Timestamp,
    /// Date.
    Date,
    /// Time of day / duration.
    Time,
    /// Datetime without zone.
    Datetime,
    /// Year.
    Year,
    /// Fixed-point decimal.
    Decimal,
    /// Text blob.
    Text,
    /// Binary blob.
    Blob,
    /// Variable-length text.
    Varchar,
    /// Variable-length binary.
    Varbinary,
    /// Fixed-length text.
    Char,
    /// Fixed-length binary.
    Binary,
    /// Bit field.
    Bit,
    /// Enum member.
    Enum,
    /// Set members.
    Set,
    /// Tuple (query-only).
    Tuple,
    /// Spatial value.
    Geometry,
    /// JSON document.
    Json,
    /// Expression (query-only).
    Expression,
    /// Hexadecimal number literal.
    HexNum,
    /// Hexadecimal value literal.
    HexVal,
    /// Bit literal.
    BitNum,
}

impl WireType {
    /// Every wire type, in code table order.
    pub const ALL: [WireType; 35] = [
        WireType::NullType,
        WireType::Int8,
        WireType::Uint8,
        WireType::Int16,
        WireType::Uint16,
        WireType::Int24,
        WireType::Uint24,
        WireType::Int32,
        WireType::Uint32,
        WireType::Int64,
        WireType::Uint64,
        WireType::Float32,
        WireType::Float64,
        WireType::Timestamp,
        WireType::Date,
        WireType::Time,
        WireType::Datetime,
        WireType::Year,
        WireType::Decimal,
        WireType::Text,
        WireType::Blob,
        WireType::Varchar,
        WireType::Varbinary,
        WireType::Char,
        WireType::Binary,
        WireType::Bit,
        WireType::Enum,
        WireType::Set,
        WireType::Tuple,
        WireType::Geometry,
        WireType::Json,
        WireType::Expression,
        WireType::HexNum,
        WireType::HexVal,
        WireType::BitNum,
    ];

    /// Converts from a numeric wire code.
    pub fn from_code(code: u32) -> Option<Self> {
        let ty = match code {
            0 => WireType::NullType,
            257 => WireType::Int8,
            770 => WireType::Uint8,
            259 => WireType::Int16,
            772 => WireType::Uint16,
            261 => WireType::Int24,
            774 => WireType::Uint24,
            263 => WireType::Int32,
            776 => WireType::Uint32,
            265 => WireType::Int64,
            778 => WireType::Uint64,
            1035 => WireType::Float32,
            1036 => WireType::Float64,
            2061 => WireType::Timestamp,
            2062 => WireType::Date,
            2063 => WireType::Time,
            2064 => WireType::Datetime,
            785 => WireType::Year,
            18 => WireType::Decimal,
            6163 => WireType::Text,
            10260 => WireType::Blob,
            6165 => WireType::Varchar,
            10262 => WireType::Varbinary,
            6167 => WireType::Char,
            10264 => WireType::Binary,
            2073 => WireType::Bit,
            2074 => WireType::Enum,
            2075 => WireType::Set,
            28 => WireType::Tuple,
            2077 => WireType::Geometry,
            2078 => WireType::Json,
            31 => WireType::Expression,
            4128 => WireType::HexNum,
            4129 => WireType::HexVal,
            4130 => WireType::BitNum,
            _ => return None,
        };
        Some(ty)
    }

    /// Converts to the numeric wire code.
    pub fn to_code(self) -> u32 {
        match self {
            WireType::NullType => 0,
            WireType::Int8 => 257,
            WireType::Uint8 => 770,
            WireType::Int16 => 259,
            WireType::Uint16 => 772,
            WireType::Int24 => 261,
            WireType::Uint24 => 774,
            WireType::Int32 => 263,
            WireType::Uint32 => 776,
            WireType::Int64 => 265,
            WireType::Uint64 => 778,
            WireType::Float32 => 1035,
            WireType::Float64 => 1036,
            WireType::Timestamp => 2061,
            WireType::Date => 2062,
            WireType::Time => 2063,
            WireType::Datetime => 2064,
            WireType::Year => 785,
            WireType::Decimal => 18,
            WireType::Text => 6163,
            WireType::Blob => 10260,
            WireType::Varchar => 6165,
            WireType::Varbinary => 10262,
            WireType::Char => 6167,
            WireType::Binary => 10264,
            WireType::Bit => 2073,
            WireType::Enum => 2074,
            WireType::Set => 2075,
            WireType::Tuple => 28,
            WireType::Geometry => 2077,
            WireType::Json => 2078,
            WireType::Expression => 31,
            WireType::HexNum => 4128,
            WireType::HexVal => 4129,
            WireType::BitNum => 4130,
        }
    }

    /// Upper-case name as used by the driver.
    pub fn as_str(self) -> &'static str {
        match self {
            WireType::NullType => "NULL_TYPE",
            WireType::Int8 => "INT8",
            WireType::Uint8 => "UINT8",
            WireType::Int16 => "INT16",
            WireType::Uint16 => "UINT16",
            WireType::Int24 => "INT24",
            WireType::Uint24 => "UINT24",
            WireType::Int32 => "INT32",
            WireType::Uint32 => "UINT32",
            WireType::Int64 => "INT64",
            WireType::Uint64 => "UINT64",
            WireType::Float32 => "FLOAT32",
            WireType::Float64 => "FLOAT64",
            WireType::Timestamp => "TIMESTAMP",
            WireType::Date => "DATE",
            WireType::Time => "TIME",
            WireType::Datetime => "DATETIME",
            WireType::Year => "YEAR",
            WireType::Decimal => "DECIMAL",
            WireType::Text => "TEXT",
            WireType::Blob => "BLOB",
            WireType::Varchar => "VARCHAR",
            WireType::Varbinary => "VARBINARY",
            WireType::Char => "CHAR",
            WireType::Binary => "BINARY",
            WireType::Bit => "BIT",
            WireType::Enum => "ENUM",
            WireType::Set => "SET",
            WireType::Tuple => "TUPLE",
            WireType::Geometry => "GEOMETRY",
            WireType::Json => "JSON",
            WireType::Expression => "EXPRESSION",
            WireType::HexNum => "HEXNUM",
            WireType::HexVal => "HEXVAL",
            WireType::BitNum => "BITNUM",
        }
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character set family of a text column, derived from its collation id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// utf8mb3 / utf8mb4 collations.
    Utf8,
    /// latin1 collations.
    Latin1,
    /// ascii collations.
    Ascii,
    /// The `binary` pseudo charset (id 63).
    Binary,
    /// ucs2 and utf16 collations, big-endian code units.
    Utf16,
    /// utf16le collations.
    Utf16Le,
    /// utf32 collations.
    Utf32,
    /// Legacy multibyte charsets that are not decoded.
    Unsupported(&'static str),
    /// Unspecified or unrecognized collation.
    Other(u32),
}

impl Charset {
    /// Maps a MySQL collation id to its character set.
    pub fn from_id(id: u32) -> Self {
        match id {
            33 | 76 | 83 | 192..=215 | 223 => Charset::Utf8,
            45 | 46 | 224..=247 | 255..=323 => Charset::Utf8,
            5 | 8 | 15 | 31 | 47 | 48 | 49 | 94 => Charset::Latin1,
            11 | 65 => Charset::Ascii,
            63 => Charset::Binary,
            35 | 90 | 128..=151 | 159 => Charset::Utf16,
            54 | 55 | 101..=124 => Charset::Utf16,
            56 | 62 => Charset::Utf16Le,
            60 | 61 | 160..=183 => Charset::Utf32,
            1 | 84 => Charset::Unsupported("big5"),
            12 | 91 => Charset::Unsupported("ujis"),
            13 | 88 => Charset::Unsupported("sjis"),
            19 | 85 => Charset::Unsupported("euckr"),
            24 | 86 => Charset::Unsupported("gb2312"),
            28 | 87 => Charset::Unsupported("gbk"),
            95 | 96 => Charset::Unsupported("cp932"),
            97 | 98 => Charset::Unsupported("eucjpms"),
            248..=250 => Charset::Unsupported("gb18030"),
            other => Charset::Other(other),
        }
    }

    /// Decodes text bytes into a string.
    ///
    /// `binary` and unrecognized charsets are read as UTF-8.
    pub fn decode(self, bytes: &[u8]) -> Result<String, String> {
        match self {
            Charset::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Charset::Ascii => {
                if bytes.is_ascii() {
                    Ok(bytes.iter().map(|&b| char::from(b)).collect())
                } else {
                    Err("non-ASCII byte in ascii column".to_string())
                }
            }
            Charset::Utf16 => decode_utf16(bytes, u16::from_be_bytes),
            Charset::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
            Charset::Utf32 => {
                if bytes.len() % 4 != 0 {
                    return Err(format!("utf32 payload of {} bytes", bytes.len()));
                }
                bytes
                    .chunks_exact(4)
                    .map(|c| {
                        let unit = u32::from_be_bytes([c[0], c[1], c[2], c[3]]);
                        char::from_u32(unit)
                            .ok_or_else(|| format!("invalid utf32 code point {unit:#x}"))
                    })
                    .collect()
            }
            Charset::Unsupported(name) => Err(format!("unsupported charset {name}")),
            Charset::Utf8 | Charset::Binary | Charset::Other(_) => std::str::from_utf8(bytes)
                .map(str::to_string)
                .map_err(|e| e.to_string()),
        }
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err(format!("utf16 payload of {} bytes", bytes.len()));
    }
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|c| c.map_err(|e| format!("unpaired utf16 surrogate {:#x}", e.unpaired_surrogate())))
        .collect()
}

/// Metadata of one column in a raw row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Column name.
    pub name: String,
    /// Wire type tag.
    pub wire_type: WireType,
    /// Collation id of the column.
    pub charset: u32,
    /// Driver flag bits.
    pub flags: u32,
}

impl Field {
    /// Creates a field with no charset and no flags.
    pub fn new(name: impl Into<String>, wire_type: WireType) -> Self {
        Self {
            name: name.into(),
            wire_type,
            charset: 0,
            flags: 0,
        }
    }

    /// Creates a field from the driver's raw type code.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedWireType` for codes outside the known set.
    pub fn from_code(
        name: impl Into<String>,
        code: u32,
        charset: u32,
        flags: u32,
    ) -> SerializeResult<Self> {
        let name = name.into();
        let wire_type = WireType::from_code(code)
            .ok_or_else(|| SerializeError::UnsupportedWireType {
                column: name.clone(),
                code,
            })?;
        Ok(Self {
            name,
            wire_type,
            charset,
            flags,
        })
    }

    /// Sets the collation id.
    #[must_use]
    pub fn with_charset(mut self, charset: u32) -> Self {
        self.charset = charset;
        self
    }
}

/// A single raw column value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// SQL NULL.
    Null,
    /// Text protocol payload.
    Bytes(Bytes),
}

impl RawValue {
    /// Creates a payload value.
    pub fn bytes(bytes: impl Into<Bytes>) -> Self {
        RawValue::Bytes(bytes.into())
    }

    /// Creates a payload from text.
    pub fn text(text: &str) -> Self {
        RawValue::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }

    /// Encodes a signed integer the way the driver does.
    pub fn int(n: i64) -> Self {
        RawValue::Bytes(Bytes::from(n.to_string()))
    }

    /// Encodes an unsigned integer the way the driver does.
    pub fn uint(n: u64) -> Self {
        RawValue::Bytes(Bytes::from(n.to_string()))
    }

    /// Encodes a float with the shortest representation that round-trips.
    pub fn float(n: f64) -> Self {
        RawValue::Bytes(Bytes::from(format!("{n:e}")))
    }

    /// Whether this is SQL NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    /// The payload bytes, if not NULL.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RawValue::Null => None,
            RawValue::Bytes(b) => Some(&b[..]),
        }
    }
}

/// Field metadata plus zero or more physical rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// Column metadata, in value order.
    pub fields: Vec<Field>,
    /// Physical rows; each has one value per field.
    pub rows: Vec<Vec<RawValue>>,
}

impl RawRow {
    /// Creates a raw row set.
    pub fn new(fields: Vec<Field>, rows: Vec<Vec<RawValue>>) -> Self {
        Self { fields, rows }
    }

    /// Returns the first physical row after checking its shape.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` when there are no fields, no rows, or the
    /// first row's value count differs from the field count.
    pub fn first_row(&self) -> SerializeResult<&[RawValue]> {
        if self.fields.is_empty() {
            return Err(SerializeError::shape_mismatch("row has no fields"));
        }
        let row = self
            .rows
            .first()
            .ok_or_else(|| SerializeError::shape_mismatch("row set has no rows"))?;
        if row.len() != self.fields.len() {
            return Err(SerializeError::shape_mismatch(format!(
                "row has {} values for {} fields",
                row.len(),
                self.fields.len()
            )));
        }
        Ok(row)
    }
}

/// Before and after images of one updated row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatedRow {
    /// Row before the update.
    pub before: RawRow,
    /// Row after the update.
    pub after: RawRow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_codes_roundtrip() {
        for ty in WireType::ALL {
            assert_eq!(WireType::from_code(ty.to_code()), Some(ty));
        }
        assert_eq!(WireType::from_code(9999), None);
        assert_eq!(WireType::Varchar.to_string(), "VARCHAR");
    }

    #[test]
    fn unknown_code_fails_loudly() {
        let err = Field::from_code("mystery", 4242, 0, 0).unwrap_err();
        assert!(matches!(
            err,
            SerializeError::UnsupportedWireType { ref column, code: 4242 } if column == "mystery"
        ));
    }

    #[test]
    fn charset_decoding() {
        assert_eq!(Charset::from_id(255), Charset::Utf8);
        assert_eq!(Charset::from_id(63), Charset::Binary);
        assert_eq!(Charset::from_id(0), Charset::Other(0));

        assert_eq!(Charset::Utf8.decode("héllo".as_bytes()).unwrap(), "héllo");
        assert_eq!(Charset::Latin1.decode(&[0x68, 0xe9]).unwrap(), "hé");
        assert!(Charset::Ascii.decode(&[0xe9]).is_err());
        assert!(Charset::Other(0).decode(&[0xff, 0xfe]).is_err());
    }

    #[test]
    fn wide_charsets_decode() {
        assert_eq!(Charset::from_id(35), Charset::Utf16);
        assert_eq!(Charset::from_id(54), Charset::Utf16);
        assert_eq!(Charset::from_id(56), Charset::Utf16Le);
        assert_eq!(Charset::from_id(60), Charset::Utf32);

        assert_eq!(Charset::Utf16.decode(&[0x00, 0x68, 0x00, 0xe9]).unwrap(), "hé");
        assert_eq!(Charset::Utf16.decode(&[0xd8, 0x3d, 0xde, 0x00]).unwrap(), "\u{1f600}");
        assert_eq!(Charset::Utf16Le.decode(&[0x68, 0x00, 0xe9, 0x00]).unwrap(), "hé");
        assert_eq!(
            Charset::Utf32.decode(&[0x00, 0x01, 0xf6, 0x00]).unwrap(),
            "\u{1f600}"
        );

        assert!(Charset::Utf16.decode(&[0x00]).is_err());
        assert!(Charset::Utf16.decode(&[0xd8, 0x3d]).is_err());
        assert!(Charset::Utf32.decode(&[0x00, 0x11, 0x00, 0x00]).is_err());
    }

    #[test]
    fn legacy_multibyte_charsets_are_named() {
        assert_eq!(Charset::from_id(13), Charset::Unsupported("sjis"));
        assert_eq!(Charset::from_id(28), Charset::Unsupported("gbk"));
        let err = Charset::from_id(1).decode(b"abc").unwrap_err();
        assert!(err.contains("big5"), "{err}");
    }

    #[test]
    fn raw_value_encodings() {
        assert_eq!(RawValue::int(-12).as_bytes(), Some(&b"-12"[..]));
        assert_eq!(RawValue::uint(u64::MAX).as_bytes(), Some(&b"18446744073709551615"[..]));
        let max = RawValue::float(f64::MAX);
        let text = std::str::from_utf8(max.as_bytes().unwrap()).unwrap();
        assert_eq!(text.parse::<f64>().unwrap(), f64::MAX);
        assert!(RawValue::Null.is_null());
    }

    #[test]
    fn first_row_checks_shape() {
        let fields = vec![Field::new("id", WireType::Int32)];
        assert!(RawRow::new(vec![], vec![vec![]]).first_row().is_err());
        assert!(RawRow::new(fields.clone(), vec![]).first_row().is_err());
        assert!(RawRow::new(fields.clone(), vec![vec![]]).first_row().is_err());

        let row = RawRow::new(fields, vec![vec![RawValue::int(1)], vec![RawValue::int(2)]]);
        assert_eq!(row.first_row().unwrap(), &[RawValue::int(1)]);
    }
}
