//! Low-level binary reader/writer for the save wire format.
//!
//! Everything in a save is little-endian. Strings use the Klei convention:
//! an `i32` byte length followed by UTF-8 bytes, where `-1` means a null
//! string and `0` an empty one. [`BinaryReader`] tracks its byte offset so
//! errors can report where in the stream they occurred.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Result, SaveError};

/// Positional reader over an in-memory byte buffer.
pub struct BinaryReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BinaryReader { data, offset: 0 }
    }

    /// Current byte offset from the start of the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of unread bytes.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Consume `count` bytes, or fail with [`SaveError::Truncated`].
    fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        if count > self.remaining() {
            return Err(SaveError::Truncated {
                offset: self.offset,
                needed: count,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(LittleEndian::read_i16(self.take(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(LittleEndian::read_i32(self.take(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(LittleEndian::read_i64(self.take(8)?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(LittleEndian::read_f32(self.take(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(LittleEndian::read_f64(self.take(8)?))
    }

    /// A boolean is a single byte; anything non-zero is true.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    /// Read a fixed-length raw ASCII string (no length prefix). Only used
    /// for the short `"KSAV"` body marker.
    pub fn read_chars(&mut self, count: usize) -> Result<String> {
        let offset = self.offset;
        let bytes = self.take(count)?;
        if !bytes.is_ascii() {
            return Err(SaveError::corruption_at(
                "expected ASCII marker bytes",
                offset,
            ));
        }
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Read a length-prefixed Klei string. `-1` is null, `0` is empty,
    /// anything below `-1` is corruption.
    pub fn read_klei_string(&mut self) -> Result<Option<String>> {
        let offset = self.offset;
        let length = self.read_i32()?;
        match length {
            -1 => Ok(None),
            0 => Ok(Some(String::new())),
            n if n > 0 => {
                let bytes = self.take(n as usize)?;
                let s = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    SaveError::corruption_at(format!("invalid UTF-8 in string: {e}"), offset)
                })?;
                Ok(Some(s))
            }
            n => Err(SaveError::corruption_at(
                format!("invalid string length {n}"),
                offset,
            )),
        }
    }

    /// Advance the cursor without interpreting the bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count)?;
        Ok(())
    }

    /// Consume and return everything from the cursor to the end.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.offset..];
        self.offset = self.data.len();
        slice
    }
}

/// Writer accumulating save bytes in memory.
///
/// Composite values embed their own byte length, so writers for those
/// build the body in a scratch `BinaryWriter` first, measure it, then
/// splice it in after the length prefix.
#[derive(Default)]
pub struct BinaryWriter {
    buf: Vec<u8>,
}

impl BinaryWriter {
    pub fn new() -> Self {
        BinaryWriter::default()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn push<const N: usize>(&mut self, bytes: [u8; N]) {
        self.buf.extend_from_slice(&bytes);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, value);
        self.push(b);
    }

    pub fn write_i16(&mut self, value: i16) {
        let mut b = [0u8; 2];
        LittleEndian::write_i16(&mut b, value);
        self.push(b);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, value);
        self.push(b);
    }

    pub fn write_i32(&mut self, value: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, value);
        self.push(b);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut b = [0u8; 8];
        LittleEndian::write_u64(&mut b, value);
        self.push(b);
    }

    pub fn write_i64(&mut self, value: i64) {
        let mut b = [0u8; 8];
        LittleEndian::write_i64(&mut b, value);
        self.push(b);
    }

    pub fn write_f32(&mut self, value: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, value);
        self.push(b);
    }

    pub fn write_f64(&mut self, value: f64) {
        let mut b = [0u8; 8];
        LittleEndian::write_f64(&mut b, value);
        self.push(b);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a raw ASCII string without a length prefix.
    pub fn write_chars(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a length-prefixed Klei string. `None` writes `-1` and no
    /// payload.
    pub fn write_klei_string(&mut self, value: Option<&str>) {
        match value {
            None => self.write_i32(-1),
            Some(s) => {
                self.write_i32(s.len() as i32);
                self.buf.extend_from_slice(s.as_bytes());
            }
        }
    }
}
