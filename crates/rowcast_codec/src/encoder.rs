//! Canonical CBOR encoder for operations.

use crate::error::{CodecError, CodecResult};
use crate::operation::{Operation, Record, RecordData};
use crate::value::{Timestamp, Value};

/// Encode an operation to canonical CBOR bytes.
///
/// The output is deterministic:
/// - Envelope keys are sorted by their encoded form (length-first, then bytewise)
/// - Record data is an array of `[name, value]` pairs in column order
/// - Integers use the shortest possible encoding
/// - No indefinite-length encoding
///
/// # Errors
///
/// Returns an error if a float value is NaN.
pub fn to_canonical_cbor(operation: &Operation) -> CodecResult<Vec<u8>> {
    let mut encoder = CanonicalEncoder::new();
    encoder.encode_operation(operation)?;
    Ok(encoder.into_bytes())
}

/// A canonical CBOR encoder.
pub struct CanonicalEncoder {
    buffer: Vec<u8>,
}

impl CanonicalEncoder {
    /// Create a new encoder.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Create a new encoder with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Consume this encoder and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Get a reference to the encoded bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Encode an operation envelope.
    pub fn encode_operation(&mut self, operation: &Operation) -> CodecResult<()> {
        match operation {
            Operation::Record(record) => self.encode_record(record),
        }
    }

    /// Encode a single typed value.
    ///
    /// NULL is a bare CBOR null; every other value is a two element array of
    /// its kind code and payload.
    pub fn encode_value(&mut self, value: &Value) -> CodecResult<()> {
        if value.is_null() {
            self.buffer.push(0xf6);
            return Ok(());
        }

        self.write_head(4, 2);
        self.write_uint(u64::from(value.kind().to_code()));

        match value {
            Value::Null => unreachable!("handled above"),
            Value::Int(n) => self.write_int(i64::from(*n)),
            Value::Long(n) => self.write_int(*n),
            Value::Float(n) => {
                if n.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.buffer.push(0xfa);
                self.buffer.extend_from_slice(&n.to_bits().to_be_bytes());
            }
            Value::Double(n) => {
                if n.is_nan() {
                    return Err(CodecError::NaNForbidden);
                }
                self.buffer.push(0xfb);
                self.buffer.extend_from_slice(&n.to_bits().to_be_bytes());
            }
            Value::Decimal(s) | Value::String(s) | Value::Json(s) => self.write_text(s),
            Value::Binary(b) => self.write_bytes(b),
            Value::NaiveDate(ts) | Value::UtcDatetime(ts) | Value::NaiveDatetime(ts) => {
                self.write_timestamp(*ts);
            }
            Value::Bool(b) => self.buffer.push(if *b { 0xf5 } else { 0xf4 }),
        }
        Ok(())
    }

    fn encode_record(&mut self, record: &Record) -> CodecResult<()> {
        // Keys in canonical order: "data", "type", "table", "schema".
        let entries = if record.data.is_some() { 4 } else { 3 };
        self.write_head(5, entries);

        if let Some(ref data) = record.data {
            self.write_text("data");
            self.encode_data(data)?;
        }
        self.write_text("type");
        self.write_uint(u64::from(record.op_type.to_code()));
        self.write_text("table");
        self.write_text(&record.table_name);
        self.write_text("schema");
        self.write_text(&record.schema_name);
        Ok(())
    }

    fn encode_data(&mut self, data: &RecordData) -> CodecResult<()> {
        self.write_head(4, data.len() as u64);
        for (name, value) in data.iter() {
            self.write_head(4, 2);
            self.write_text(name);
            self.encode_value(value)?;
        }
        Ok(())
    }

    fn write_timestamp(&mut self, ts: Timestamp) {
        self.write_head(4, 2);
        self.write_int(ts.seconds);
        self.write_int(i64::from(ts.nanos));
    }

    fn write_uint(&mut self, n: u64) {
        self.write_head(0, n);
    }

    #[allow(clippy::cast_sign_loss)]
    fn write_int(&mut self, n: i64) {
        if n >= 0 {
            self.write_head(0, n as u64);
        } else {
            // -1 encodes as 0, -2 as 1, ...
            self.write_head(1, (-(n + 1)) as u64);
        }
    }

    fn write_bytes(&mut self, bytes: &[u8]) {
        self.write_head(2, bytes.len() as u64);
        self.buffer.extend_from_slice(bytes);
    }

    fn write_text(&mut self, text: &str) {
        self.write_head(3, text.len() as u64);
        self.buffer.extend_from_slice(text.as_bytes());
    }

    #[allow(clippy::cast_possible_truncation)]
    fn write_head(&mut self, major_type: u8, value: u64) {
        let mt = major_type << 5;

        if value < 24 {
            self.buffer.push(mt | (value as u8));
        } else if u8::try_from(value).is_ok() {
            self.buffer.push(mt | 24);
            self.buffer.push(value as u8);
        } else if u16::try_from(value).is_ok() {
            self.buffer.push(mt | 25);
            self.buffer.extend_from_slice(&(value as u16).to_be_bytes());
        } else if u32::try_from(value).is_ok() {
            self.buffer.push(mt | 26);
            self.buffer.extend_from_slice(&(value as u32).to_be_bytes());
        } else {
            self.buffer.push(mt | 27);
            self.buffer.extend_from_slice(&value.to_be_bytes());
        }
    }
}

impl Default for CanonicalEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value_bytes(value: &Value) -> Vec<u8> {
        let mut encoder = CanonicalEncoder::new();
        encoder.encode_value(value).unwrap();
        encoder.into_bytes()
    }

    #[test]
    fn null_is_bare() {
        assert_eq!(value_bytes(&Value::Null), vec![0xf6]);
    }

    #[test]
    fn int_and_long_are_tagged() {
        assert_eq!(value_bytes(&Value::Int(123)), vec![0x82, 0x01, 0x18, 123]);
        assert_eq!(value_bytes(&Value::Long(-1)), vec![0x82, 0x02, 0x20]);
        assert_eq!(
            value_bytes(&Value::Long(i64::MAX)),
            vec![0x82, 0x02, 0x1b, 0x7f, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff]
        );
    }

    #[test]
    fn floats_keep_full_width() {
        let mut expected = vec![0x82, 0x04, 0xfb];
        expected.extend_from_slice(&f64::MAX.to_bits().to_be_bytes());
        assert_eq!(value_bytes(&Value::Double(f64::MAX)), expected);

        let mut expected = vec![0x82, 0x03, 0xfa];
        expected.extend_from_slice(&123.456f32.to_bits().to_be_bytes());
        assert_eq!(value_bytes(&Value::Float(123.456)), expected);
    }

    #[test]
    fn nan_rejected() {
        let mut encoder = CanonicalEncoder::new();
        assert_eq!(
            encoder.encode_value(&Value::Double(f64::NAN)),
            Err(CodecError::NaNForbidden)
        );
    }

    #[test]
    fn text_kinds_share_payload_form() {
        assert_eq!(
            value_bytes(&Value::Decimal("1.5".into())),
            vec![0x82, 0x05, 0x63, b'1', b'.', b'5']
        );
        assert_eq!(value_bytes(&Value::Json("{}".into())), vec![0x82, 0x08, 0x62, b'{', b'}']);
    }

    #[test]
    fn timestamp_is_seconds_and_nanos() {
        assert_eq!(
            value_bytes(&Value::NaiveDatetime(Timestamp::new(1, 999_999_000))),
            vec![0x82, 0x0b, 0x82, 0x01, 0x1a, 0x3b, 0x9a, 0xc6, 0x18]
        );
    }

    #[test]
    fn truncate_envelope() {
        let op = Operation::Record(Record::truncate("s", "t"));
        let bytes = to_canonical_cbor(&op).unwrap();
        assert_eq!(
            bytes,
            vec![
                0xa3, 0x64, b't', b'y', b'p', b'e', 0x04, 0x65, b't', b'a', b'b', b'l', b'e',
                0x61, b't', 0x66, b's', b'c', b'h', b'e', b'm', b'a', 0x61, b's',
            ]
        );
    }

    #[test]
    fn data_pairs_follow_column_order() {
        let mut data = RecordData::new();
        data.insert("zz", Value::Int(1));
        data.insert("b", Value::Null);

        let bytes = to_canonical_cbor(&Record::delete("s", "t", data).into()).unwrap();
        // "data" sorts first in the envelope; its pairs keep insertion order.
        assert_eq!(
            &bytes[..15],
            &[
                0xa4, 0x64, b'd', b'a', b't', b'a', 0x82, 0x82, 0x62, b'z', b'z', 0x82, 0x01, 0x01,
                0x82,
            ]
        );
        assert_eq!(&bytes[15..18], &[0x61, b'b', 0xf6]);
    }
}
