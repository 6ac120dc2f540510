//! Destinations for serialized operations.

use crate::error::{SerializeError, SerializeResult};
use parking_lot::Mutex;
use rowcast_codec::Operation;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives one operation per successful serializer call.
///
/// Implementations must accept concurrent calls; a serializer shared
/// between threads forwards every call to the same sink.
pub trait OperationSink: Send + Sync {
    /// Accepts one operation.
    fn send(&self, operation: Operation) -> SerializeResult<()>;
}

impl<T: OperationSink + ?Sized> OperationSink for &T {
    fn send(&self, operation: Operation) -> SerializeResult<()> {
        (**self).send(operation)
    }
}

impl<T: OperationSink + ?Sized> OperationSink for Arc<T> {
    fn send(&self, operation: Operation) -> SerializeResult<()> {
        (**self).send(operation)
    }
}

/// Collects operations in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    operations: Mutex<Vec<Operation>>,
    failing: AtomicBool,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent sends fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Snapshot of the received operations, in arrival order.
    pub fn operations(&self) -> Vec<Operation> {
        self.operations.lock().clone()
    }

    /// The most recent operation.
    pub fn last(&self) -> Option<Operation> {
        self.operations.lock().last().cloned()
    }

    /// Number of received operations.
    pub fn len(&self) -> usize {
        self.operations.lock().len()
    }

    /// Whether nothing was received.
    pub fn is_empty(&self) -> bool {
        self.operations.lock().is_empty()
    }

    /// Removes and returns every received operation.
    pub fn take(&self) -> Vec<Operation> {
        std::mem::take(&mut *self.operations.lock())
    }
}

impl OperationSink for MemorySink {
    fn send(&self, operation: Operation) -> SerializeResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SerializeError::sink("memory sink is failing"));
        }
        self.operations.lock().push(operation);
        Ok(())
    }
}

/// Writes operations as length-prefixed canonical CBOR frames.
///
/// Each frame is a 4-byte big-endian length followed by the encoded
/// operation.
#[derive(Debug)]
pub struct EncodingSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> EncodingSink<W> {
    /// Wraps a writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> OperationSink for EncodingSink<W> {
    fn send(&self, operation: Operation) -> SerializeResult<()> {
        let bytes = operation.encode()?;
        let len = u32::try_from(bytes.len())
            .map_err(|_| SerializeError::sink(format!("frame of {} bytes too large", bytes.len())))?;

        write_frame(&mut *self.writer.lock(), len, &bytes)
            .map_err(|e| SerializeError::sink(e.to_string()))
    }
}

fn write_frame<W: Write>(writer: &mut W, len: u32, bytes: &[u8]) -> std::io::Result<()> {
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(bytes)?;
    writer.flush()
}

/// Splits a buffer written by [`EncodingSink`] back into operations.
///
/// # Errors
///
/// Returns `Sink` for a truncated frame and `Codec` for a frame that does
/// not decode.
pub fn read_frames(mut bytes: &[u8]) -> SerializeResult<Vec<Operation>> {
    let mut operations = Vec::new();
    while !bytes.is_empty() {
        if bytes.len() < 4 {
            return Err(SerializeError::sink("truncated frame header"));
        }
        let (header, rest) = bytes.split_at(4);
        let len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
        if rest.len() < len {
            return Err(SerializeError::sink(format!(
                "frame claims {len} bytes, {} available",
                rest.len()
            )));
        }
        let (frame, rest) = rest.split_at(len);
        operations.push(Operation::decode(frame)?);
        bytes = rest;
    }
    Ok(operations)
}
