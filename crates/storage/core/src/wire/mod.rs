//! Compact binary wire codec.
//!
//! Payloads are plain byte vectors built from a handful of primitives:
//! - unsigned integers as LEB128 variable-width integers (`0` is one byte)
//! - signed integers zig-zag mapped onto the unsigned form
//! - strings as a varint byte length followed by UTF-8 bytes
//!
//! Framing is the transport's concern; a payload carries no header of its own.

mod error;
mod value;

pub use error::WireError;
pub use value::WireValue;

use crate::config::StorageConfig;

/// Most bytes a 64-bit LEB128 integer can occupy.
const MAX_VARINT_BYTES: usize = 10;

/// Growable byte sink for wire payloads.
#[derive(Clone, Debug, Default)]
pub struct WireWriter {
    buffer: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    /// Writes `value` as a LEB128 variable-width integer.
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let low = (value & 0x7f) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(low);
                return;
            }
            self.buffer.push(low | 0x80);
        }
    }

    /// Writes `value` zig-zag mapped, so small negatives stay short.
    pub fn write_signed(&mut self, value: i64) {
        self.write_varint(((value << 1) ^ (value >> 63)) as u64);
    }

    /// Writes a length-prefixed string, refusing any the reader would reject.
    pub fn write_str(&mut self, value: &str) -> Result<(), WireError> {
        if value.len() > StorageConfig::MAX_WIRE_STRING_LEN {
            return Err(WireError::StringTooLong {
                len: value.len(),
                max: StorageConfig::MAX_WIRE_STRING_LEN,
            });
        }
        self.write_varint(value.len() as u64);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor over a received wire payload.
#[derive(Clone, Debug)]
pub struct WireReader<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails if any bytes remain unread.
    pub fn finish(&self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            trailing => Err(WireError::TrailingBytes(trailing)),
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let byte = *self
            .buffer
            .get(self.position)
            .ok_or(WireError::UnexpectedEnd {
                needed: 1,
                remaining: 0,
            })?;
        self.position += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(WireError::UnexpectedEnd {
                needed: len,
                remaining,
            });
        }
        let bytes = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    pub fn read_bool(&mut self) -> Result<bool, WireError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    pub fn read_varint(&mut self) -> Result<u64, WireError> {
        let mut value = 0u64;
        for index in 0..MAX_VARINT_BYTES {
            let byte = self.read_u8()?;
            let bits = u64::from(byte & 0x7f);
            // The tenth byte may only contribute the single remaining bit
            if index == MAX_VARINT_BYTES - 1 && bits > 1 {
                return Err(WireError::VarintOverflow);
            }
            value |= bits << (7 * index);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(WireError::VarintOverflow)
    }

    pub fn read_signed(&mut self) -> Result<i64, WireError> {
        let raw = self.read_varint()?;
        Ok(((raw >> 1) as i64) ^ -((raw & 1) as i64))
    }

    /// Reads a varint used as a length or index.
    pub fn read_len(&mut self) -> Result<usize, WireError> {
        let raw = self.read_varint()?;
        usize::try_from(raw).map_err(|_| WireError::VarintOverflow)
    }

    pub fn read_str(&mut self) -> Result<&'a str, WireError> {
        let len = self.read_len()?;
        if len > StorageConfig::MAX_WIRE_STRING_LEN {
            return Err(WireError::StringTooLong {
                len,
                max: StorageConfig::MAX_WIRE_STRING_LEN,
            });
        }
        let bytes = self.read_bytes(len)?;
        core::str::from_utf8(bytes).map_err(|_| WireError::InvalidUtf8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn varint_boundaries() {
        let mut writer = WireWriter::new();
        for value in [0, 1, 127, 128, 16_383, 16_384, u64::MAX] {
            writer.write_varint(value);
        }
        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        for expected in [0, 1, 127, 128, 16_383, 16_384, u64::MAX] {
            assert_eq!(reader.read_varint().unwrap(), expected);
        }
        reader.finish().unwrap();
    }

    #[test]
    fn zero_is_a_single_byte() {
        let mut writer = WireWriter::new();
        writer.write_varint(0);
        assert_eq!(writer.as_slice(), &[0]);
    }

    #[test]
    fn signed_values_use_zigzag() {
        let mut writer = WireWriter::new();
        writer.write_signed(-1);
        writer.write_signed(1);
        writer.write_signed(i64::MIN);
        assert_eq!(&writer.as_slice()[..2], &[1, 2]);

        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_signed().unwrap(), -1);
        assert_eq!(reader.read_signed().unwrap(), 1);
        assert_eq!(reader.read_signed().unwrap(), i64::MIN);
    }

    #[test]
    fn overlong_varint_is_rejected() {
        let bytes = [0xff; 11];
        let mut reader = WireReader::new(&bytes);
        assert_eq!(reader.read_varint(), Err(WireError::VarintOverflow));
    }

    #[test]
    fn truncated_string_reports_missing_bytes() {
        let mut writer = WireWriter::new();
        writer.write_varint(5);
        writer.write_bytes(b"ab");
        let bytes = writer.into_bytes();
        let mut reader = WireReader::new(&bytes);
        assert_eq!(
            reader.read_str(),
            Err(WireError::UnexpectedEnd {
                needed: 5,
                remaining: 2
            })
        );
    }

    #[test]
    fn string_limit_holds_on_both_sides() {
        let max = StorageConfig::MAX_WIRE_STRING_LEN;
        let mut writer = WireWriter::new();
        assert_eq!(
            writer.write_str(&"a".repeat(max + 1)),
            Err(WireError::StringTooLong { len: max + 1, max })
        );
        assert!(writer.is_empty());

        writer.write_varint(max as u64 + 1);
        let bytes = writer.into_bytes();
        assert_eq!(
            WireReader::new(&bytes).read_str(),
            Err(WireError::StringTooLong { len: max + 1, max })
        );
    }

    #[test]
    fn trailing_bytes_are_reported() {
        let bytes = [0, 0];
        let mut reader = WireReader::new(&bytes);
        reader.read_varint().unwrap();
        assert_eq!(reader.finish(), Err(WireError::TrailingBytes(1)));
    }
}
