//! Canonical CBOR decoder for operations.

use crate::error::{CodecError, CodecResult};
use crate::operation::{OpType, Operation, Record, RecordData};
use crate::value::{Timestamp, Value, ValueKind};

/// Decode an operation from CBOR bytes.
///
/// # Errors
///
/// Returns an error if the bytes are not a canonical encoding of an
/// operation, or if input remains after the operation.
pub fn from_cbor(bytes: &[u8]) -> CodecResult<Operation> {
    let mut decoder = CanonicalDecoder::new(bytes);
    let operation = decoder.decode_operation()?;
    if !decoder.is_empty() {
        return Err(CodecError::invalid_structure("trailing bytes after operation"));
    }
    Ok(operation)
}

/// Maximum allowed element count for maps and arrays.
const MAX_CONTAINER_ELEMENTS: u64 = 1024 * 1024;

/// Maximum allowed byte/string length.
const MAX_BYTES_LENGTH: u64 = 256 * 1024 * 1024;

/// A canonical CBOR decoder.
///
/// Rejects non-shortest integers, unsorted envelope keys, repeated column
/// names, indefinite lengths and NaN floats.
pub struct CanonicalDecoder<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> CanonicalDecoder<'a> {
    /// Create a new decoder for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Decode an operation envelope.
    pub fn decode_operation(&mut self) -> CodecResult<Operation> {
        let entries = self.read_len(5)?;

        let mut op_type = None;
        let mut schema_name = None;
        let mut table_name = None;
        let mut data = None;

        let mut prev_key: Option<&'a [u8]> = None;
        for _ in 0..entries {
            let (key, raw_key) = self.read_key(prev_key)?;
            prev_key = Some(raw_key);

            match key {
                "type" => {
                    let code = self.read_uint()?;
                    let op = u8::try_from(code)
                        .ok()
                        .and_then(OpType::from_code)
                        .ok_or(CodecError::UnknownCode {
                            what: "operation",
                            code: i64::try_from(code).unwrap_or(i64::MAX),
                        })?;
                    op_type = Some(op);
                }
                "schema" => schema_name = Some(self.read_text()?.to_string()),
                "table" => table_name = Some(self.read_text()?.to_string()),
                "data" => data = Some(self.decode_data()?),
                other => {
                    return Err(CodecError::invalid_structure(format!(
                        "unexpected envelope key {other:?}"
                    )))
                }
            }
        }

        let op_type = op_type.ok_or_else(|| CodecError::invalid_structure("missing type"))?;
        let schema_name =
            schema_name.ok_or_else(|| CodecError::invalid_structure("missing schema"))?;
        let table_name = table_name.ok_or_else(|| CodecError::invalid_structure("missing table"))?;

        if op_type == OpType::Truncate && data.is_some() {
            return Err(CodecError::invalid_structure("truncate must not carry data"));
        }

        Ok(Operation::Record(Record {
            op_type,
            schema_name,
            table_name,
            data,
        }))
    }

    /// Decode a single typed value.
    pub fn decode_value(&mut self) -> CodecResult<Value> {
        if self.peek_byte()? == 0xf6 {
            self.pos += 1;
            return Ok(Value::Null);
        }

        if self.read_len(4)? != 2 {
            return Err(CodecError::invalid_structure("value must be a [kind, payload] pair"));
        }
        let code = self.read_uint()?;
        let kind = u8::try_from(code)
            .ok()
            .and_then(ValueKind::from_code)
            .ok_or(CodecError::UnknownCode {
                what: "value kind",
                code: i64::try_from(code).unwrap_or(i64::MAX),
            })?;

        let value = match kind {
            ValueKind::Null => {
                return Err(CodecError::invalid_structure("null must not be tagged"));
            }
            ValueKind::Int => {
                let n = self.read_int()?;
                Value::Int(i32::try_from(n).map_err(|_| CodecError::IntegerOverflow)?)
            }
            ValueKind::Long => Value::Long(self.read_int()?),
            ValueKind::Float => {
                self.expect_byte(0xfa, "single precision float")?;
                let bytes = self.read_bytes(4)?;
                let n = f32::from_bits(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]));
                if n.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                Value::Float(n)
            }
            ValueKind::Double => {
                self.expect_byte(0xfb, "double precision float")?;
                let bytes = self.read_bytes(8)?;
                let mut raw = [0u8; 8];
                raw.copy_from_slice(bytes);
                let n = f64::from_bits(u64::from_be_bytes(raw));
                if n.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                Value::Double(n)
            }
            ValueKind::Decimal => Value::Decimal(self.read_text()?.to_string()),
            ValueKind::String => Value::String(self.read_text()?.to_string()),
            ValueKind::Json => Value::Json(self.read_text()?.to_string()),
            ValueKind::Binary => {
                let len = self.read_len(2)?;
                Value::Binary(self.read_bytes(len)?.to_vec())
            }
            ValueKind::NaiveDate => Value::NaiveDate(self.read_timestamp()?),
            ValueKind::UtcDatetime => Value::UtcDatetime(self.read_timestamp()?),
            ValueKind::NaiveDatetime => Value::NaiveDatetime(self.read_timestamp()?),
            ValueKind::Bool => match self.read_byte()? {
                0xf4 => Value::Bool(false),
                0xf5 => Value::Bool(true),
                _ => return Err(CodecError::invalid_structure("expected boolean")),
            },
        };
        Ok(value)
    }

    fn decode_data(&mut self) -> CodecResult<RecordData> {
        let entries = self.read_len(4)?;
        // A pair takes at least three bytes.
        let remaining = self.data.len() - self.pos;
        let mut data = RecordData::with_capacity(entries.min(remaining / 3));

        for _ in 0..entries {
            if self.read_len(4)? != 2 {
                return Err(CodecError::invalid_structure(
                    "column must be a [name, value] pair",
                ));
            }
            let name = self.read_text()?;
            if data.contains(name) {
                return Err(CodecError::DuplicateColumn {
                    name: name.to_string(),
                });
            }
            let value = self.decode_value()?;
            data.insert(name, value);
        }
        Ok(data)
    }

    /// Reads a text map key and checks it sorts strictly after `prev`.
    fn read_key(&mut self, prev: Option<&'a [u8]>) -> CodecResult<(&'a str, &'a [u8])> {
        let start = self.pos;
        let key = self.read_text()?;
        let raw = &self.data[start..self.pos];

        if let Some(prev) = prev {
            let ordering = match prev.len().cmp(&raw.len()) {
                std::cmp::Ordering::Equal => prev.cmp(raw),
                other => other,
            };
            if ordering != std::cmp::Ordering::Less {
                return Err(CodecError::invalid_structure(
                    "non-canonical: map keys not in sorted order",
                ));
            }
        }
        Ok((key, raw))
    }

    fn read_timestamp(&mut self) -> CodecResult<Timestamp> {
        if self.read_len(4)? != 2 {
            return Err(CodecError::invalid_structure("timestamp must be [seconds, nanos]"));
        }
        let seconds = self.read_int()?;
        let nanos = i32::try_from(self.read_int()?).map_err(|_| CodecError::IntegerOverflow)?;
        if !(0..1_000_000_000).contains(&nanos) {
            return Err(CodecError::invalid_structure("timestamp nanos out of range"));
        }
        Ok(Timestamp::new(seconds, nanos))
    }

    fn read_text(&mut self) -> CodecResult<&'a str> {
        let len = self.read_len(3)?;
        let bytes = self.read_bytes(len)?;
        std::str::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
    }

    fn read_uint(&mut self) -> CodecResult<u64> {
        let (major, info) = self.read_initial()?;
        if major != 0 {
            return Err(CodecError::invalid_structure("expected unsigned integer"));
        }
        self.read_argument(info)
    }

    fn read_int(&mut self) -> CodecResult<i64> {
        let (major, info) = self.read_initial()?;
        let arg = self.read_argument(info)?;
        let arg = i64::try_from(arg).map_err(|_| CodecError::IntegerOverflow)?;
        match major {
            0 => Ok(arg),
            1 => Ok(-1 - arg),
            _ => Err(CodecError::invalid_structure("expected integer")),
        }
    }

    /// Reads the header of a length-prefixed item of `major` type.
    fn read_len(&mut self, major: u8) -> CodecResult<usize> {
        let (actual, info) = self.read_initial()?;
        if actual != major {
            return Err(CodecError::invalid_structure(format!(
                "expected major type {major}, found {actual}"
            )));
        }
        let len = self.read_argument(info)?;
        let limit = if major == 2 || major == 3 {
            MAX_BYTES_LENGTH
        } else {
            MAX_CONTAINER_ELEMENTS
        };
        if len > limit {
            return Err(CodecError::SizeLimitExceeded {
                claimed: len,
                max_allowed: limit,
            });
        }
        usize::try_from(len).map_err(|_| CodecError::IntegerOverflow)
    }

    fn read_initial(&mut self) -> CodecResult<(u8, u8)> {
        let byte = self.read_byte()?;
        Ok((byte >> 5, byte & 0x1f))
    }

    fn read_argument(&mut self, additional_info: u8) -> CodecResult<u64> {
        let value = match additional_info {
            0..=23 => return Ok(u64::from(additional_info)),
            24 => u64::from(self.read_byte()?),
            25 => {
                let b = self.read_bytes(2)?;
                u64::from(u16::from_be_bytes([b[0], b[1]]))
            }
            26 => {
                let b = self.read_bytes(4)?;
                u64::from(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
            }
            27 => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(self.read_bytes(8)?);
                u64::from_be_bytes(raw)
            }
            31 => return Err(CodecError::IndefiniteLengthForbidden),
            _ => return Err(CodecError::invalid_structure("reserved additional info")),
        };

        let shortest = match additional_info {
            24 => value >= 24,
            25 => u8::try_from(value).is_err(),
            26 => u16::try_from(value).is_err(),
            _ => u32::try_from(value).is_err(),
        };
        if !shortest {
            return Err(CodecError::invalid_structure(
                "non-canonical: value could be encoded in fewer bytes",
            ));
        }
        Ok(value)
    }

    fn expect_byte(&mut self, expected: u8, what: &str) -> CodecResult<()> {
        if self.read_byte()? != expected {
            return Err(CodecError::invalid_structure(format!("expected {what}")));
        }
        Ok(())
    }

    fn peek_byte(&self) -> CodecResult<u8> {
        self.data.get(self.pos).copied().ok_or(CodecError::UnexpectedEof)
    }

    #[inline]
    fn read_byte(&mut self) -> CodecResult<u8> {
        let byte = self.peek_byte()?;
        self.pos += 1;
        Ok(byte)
    }

    #[inline]
    fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(CodecError::UnexpectedEof)?;
        if end > self.data.len() {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::to_canonical_cbor;

    fn sample_upsert() -> Operation {
        let mut data = RecordData::new();
        data.insert("customer_id", Value::Int(123));
        data.insert("name", Value::String("PhaniRaj".into()));
        data.insert("decimal", Value::Decimal("156.123".into()));
        data.insert("long_value", Value::Long(i64::MAX));
        data.insert("double_value", Value::Double(f64::MAX));
        data.insert("float_value", Value::Float(123.456));
        data.insert("profile_pic", Value::Binary(b"profiles/phanatic.jpg".to_vec()));
        data.insert("date_value", Value::NaiveDate(Timestamp::new(1_102_809_600, 0)));
        data.insert("is_deleted", Value::Bool(false));
        data.insert("notes", Value::Null);
        Operation::Record(Record::upsert("sample", "Customers", data))
    }

    #[test]
    fn decodes_every_value_kind() {
        let op = sample_upsert();
        let bytes = to_canonical_cbor(&op).unwrap();
        let decoded = from_cbor(&bytes).unwrap();

        let original = op.as_record().unwrap().data.as_ref().unwrap();
        let record = decoded.as_record().unwrap();
        assert_eq!(record.op_type, OpType::Upsert);
        assert_eq!(record.schema_name, "sample");
        assert_eq!(record.table_name, "Customers");

        let data = record.data.as_ref().unwrap();
        assert_eq!(data.len(), original.len());
        for (name, value) in original.iter() {
            assert_eq!(data.get(name), Some(value), "column {name}");
        }
    }

    #[test]
    fn truncate_without_data() {
        let op = Operation::Record(Record::truncate("sample", "Customers"));
        let decoded = from_cbor(&to_canonical_cbor(&op).unwrap()).unwrap();
        assert_eq!(decoded, op);
    }

    #[test]
    fn columns_keep_their_order() {
        let op = sample_upsert();
        let decoded = from_cbor(&to_canonical_cbor(&op).unwrap()).unwrap();
        assert_eq!(decoded, op);
        assert_eq!(
            decoded.as_record().unwrap().data.as_ref().unwrap().names().next(),
            Some("customer_id")
        );
    }

    #[test]
    fn reject_duplicate_column() {
        // {"data": [["a", null], ["a", null]], "type": 3, "table": "t", "schema": "s"}
        let bytes = [
            0xa4, 0x64, b'd', b'a', b't', b'a', 0x82, 0x82, 0x61, b'a', 0xf6, 0x82, 0x61, b'a',
            0xf6, 0x64, b't', b'y', b'p', b'e', 0x03, 0x65, b't', b'a', b'b', b'l', b'e', 0x61,
            b't', 0x66, b's', b'c', b'h', b'e', b'm', b'a', 0x61, b's',
        ];
        assert_eq!(
            from_cbor(&bytes),
            Err(CodecError::DuplicateColumn { name: "a".into() })
        );
    }

    #[test]
    fn oversized_column_count_hits_eof() {
        // {"data": <array claiming 1M pairs>} with nothing after the header
        let bytes = [
            0xa1, 0x64, b'd', b'a', b't', b'a', 0x9a, 0x00, 0x10, 0x00, 0x00,
        ];
        assert_eq!(from_cbor(&bytes), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn reject_trailing_bytes() {
        let mut bytes = to_canonical_cbor(&Operation::Record(Record::truncate("s", "t"))).unwrap();
        bytes.push(0x00);
        assert!(matches!(
            from_cbor(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_unsorted_keys() {
        // {"table": "t", "type": 4, "schema": "s"}; "type" must precede "table"
        let bytes = [
            0xa3, 0x65, b't', b'a', b'b', b'l', b'e', 0x61, b't', 0x64, b't', b'y', b'p', b'e',
            0x04, 0x66, b's', b'c', b'h', b'e', b'm', b'a', 0x61, b's',
        ];
        assert!(matches!(
            from_cbor(&bytes),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_unknown_op_code() {
        let bytes = [
            0xa3, 0x64, b't', b'y', b'p', b'e', 0x09, 0x65, b't', b'a', b'b', b'l', b'e', 0x61,
            b't', 0x66, b's', b'c', b'h', b'e', b'm', b'a', 0x61, b's',
        ];
        assert_eq!(
            from_cbor(&bytes),
            Err(CodecError::UnknownCode {
                what: "operation",
                code: 9
            })
        );
    }

    #[test]
    fn reject_non_shortest_value() {
        // [1, 23] with 23 spelled in two bytes
        let mut decoder = CanonicalDecoder::new(&[0x82, 0x01, 0x18, 23]);
        assert!(matches!(
            decoder.decode_value(),
            Err(CodecError::InvalidStructure { .. })
        ));
    }

    #[test]
    fn reject_int_overflow() {
        // Int tag with a value beyond i32
        let mut decoder = CanonicalDecoder::new(&[0x82, 0x01, 0x1a, 0x80, 0x00, 0x00, 0x00]);
        assert_eq!(decoder.decode_value(), Err(CodecError::IntegerOverflow));
    }

    #[test]
    fn reject_indefinite_length() {
        let mut decoder = CanonicalDecoder::new(&[0x9f, 0x01, 0xff]);
        assert_eq!(
            decoder.decode_value(),
            Err(CodecError::IndefiniteLengthForbidden)
        );
    }

    #[test]
    fn unexpected_eof() {
        assert_eq!(from_cbor(&[]), Err(CodecError::UnexpectedEof));
        assert_eq!(from_cbor(&[0xa3, 0x64, b't']), Err(CodecError::UnexpectedEof));
    }
}
