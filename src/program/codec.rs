//! Fixed-offset little-endian codec for program payloads
//!
//! Instruction data is written into a fixed working buffer and trimmed to the
//! number of bytes actually written. Account data is read field by field with
//! explicit bounds checks so a short buffer surfaces as an error, never a panic.

use thiserror::Error;

/// Size of the scratch buffer used when encoding instruction payloads
pub const INSTRUCTION_BUFFER_LEN: usize = 1200;

/// Account decoding failures
///
/// A discriminator mismatch is *not* an error; see
/// [`ProgramAccount::deserialize`](super::accounts::ProgramAccount::deserialize).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountDecodeError {
    /// Buffer ended before a declared field
    #[error("Account data truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

/// Bounds-checked cursor over account bytes
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], AccountDecodeError> {
        if self.remaining() < len {
            return Err(AccountDecodeError::Truncated {
                offset: self.offset,
                needed: len,
                available: self.remaining(),
            });
        }
        let slice = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N], AccountDecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, AccountDecodeError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u64(&mut self) -> Result<u64, AccountDecodeError> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }
}

/// Writer over a fixed-capacity scratch buffer
///
/// Mirrors how generated bindings encode instruction data: allocate the
/// maximum payload, write fields at a running offset, then trim.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    offset: usize,
}

impl ByteWriter {
    /// Writer backed by the standard instruction scratch buffer
    pub fn instruction_buffer() -> Self {
        Self::with_capacity(INSTRUCTION_BUFFER_LEN)
    }

    /// Writer that grows as needed (used for account fixtures)
    pub fn growable() -> Self {
        Self::with_capacity(0)
    }

    fn with_capacity(len: usize) -> Self {
        Self {
            buf: vec![0u8; len],
            offset: 0,
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.offset + bytes.len();
        if end > self.buf.len() {
            self.buf.resize(end, 0);
        }
        self.buf[self.offset..end].copy_from_slice(bytes);
        self.offset = end;
    }

    pub fn write_u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    pub fn write_u64(&mut self, value: u64) {
        self.put(&value.to_le_bytes());
    }

    /// Trim the scratch buffer to the written length
    pub fn into_bytes(mut self) -> Vec<u8> {
        self.buf.truncate(self.offset);
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_trims_to_written_length() {
        let mut writer = ByteWriter::instruction_buffer();
        writer.write_u64(10990983061962034633);
        writer.write_u8(7);

        let bytes = writer.into_bytes();
        assert_eq!(bytes.len(), 9);
        assert_eq!(&bytes[..8], &[201, 13, 149, 180, 220, 208, 135, 152]);
        assert_eq!(bytes[8], 7);
    }

    #[test]
    fn test_writer_grows_past_capacity() {
        let mut writer = ByteWriter::growable();
        writer.write_u64(u64::MAX);
        writer.write_u8(1);
        assert_eq!(writer.into_bytes().len(), 9);
    }

    #[test]
    fn test_reader_reports_truncation() {
        let data = [1u8, 2, 3, 4, 5, 6, 7, 8, 9];
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 1);

        let err = reader.read_u64().unwrap_err();
        assert_eq!(
            err,
            AccountDecodeError::Truncated {
                offset: 1,
                needed: 8,
                available: 7,
            }
        );
        // Failed read does not advance
        assert_eq!(reader.remaining(), 7);
        assert_eq!(reader.read_u8().unwrap(), 2);
    }

    #[test]
    fn test_reader_little_endian() {
        let data = 0xDEAD_BEEF_u64.to_le_bytes();
        let mut reader = ByteReader::new(&data);
        assert_eq!(reader.read_u64().unwrap(), 0xDEAD_BEEF);
        assert_eq!(reader.remaining(), 0);
    }
}
