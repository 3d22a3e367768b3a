//! A bounds-checked, big-endian reader over a borrowed byte slice.
//!
//! IPFIX records carry no explicit length, so the decoder needs to walk field
//! descriptors structurally and sometimes re-read what it has just consumed
//! (for example to keep the raw bytes of a template record). [`ByteCursor`]
//! supports that through [`ByteCursor::mark`] and [`ByteCursor::reset_to`].

use snafu::ensure;

use crate::error::{BufferUnderrunSnafu, Result};

/// A saved cursor position, see [`ByteCursor::mark`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mark(usize);

#[derive(Clone, Debug)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Offset of the next byte to be read, relative to the start of this cursor.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    pub fn mark(&self) -> Mark {
        Mark(self.position)
    }

    pub fn reset_to(&mut self, mark: Mark) {
        // Marks only ever come from this cursor, so they can't point past the end.
        self.position = mark.0.min(self.data.len());
    }

    /// Bytes consumed between `mark` and the current position.
    pub fn consumed_since(&self, mark: Mark) -> &'a [u8] {
        let start = mark.0.min(self.position);
        &self.data[start..self.position]
    }

    /// Everything not read yet, without advancing.
    pub fn peek_remaining(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    fn ensure_remaining(&self, needed: usize) -> Result<()> {
        let remaining = self.remaining();
        ensure!(
            needed <= remaining,
            BufferUnderrunSnafu {
                needed,
                remaining,
                position: self.position,
            }
        );
        Ok(())
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(len)?;
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Splits off the next `len` bytes as an independent cursor and advances past them.
    pub fn read_slice(&mut self, len: usize) -> Result<ByteCursor<'a>> {
        self.read_bytes(len).map(ByteCursor::new)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.read_bytes(N)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.read_array::<1>().map(|b| b[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_array().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_array().map(u32::from_be_bytes)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_array().map(u64::from_be_bytes)
    }

    pub fn read_u128(&mut self) -> Result<u128> {
        self.read_array().map(u128::from_be_bytes)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        self.read_array().map(f32::from_be_bytes)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        self.read_array().map(f64::from_be_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn reads_big_endian() {
        let data = [0x00, 0x0a, 0xde, 0xad, 0xbe, 0xef, 0x01];
        let mut cursor = ByteCursor::new(&data);

        assert_eq!(cursor.read_u16().unwrap(), 10);
        assert_eq!(cursor.read_u32().unwrap(), 0xdead_beef);
        assert_eq!(cursor.read_u8().unwrap(), 1);
        assert!(!cursor.has_remaining());
    }

    #[test]
    fn underrun_reports_position() {
        let data = [0x01, 0x02, 0x03];
        let mut cursor = ByteCursor::new(&data);
        cursor.read_u8().unwrap();

        match cursor.read_u32() {
            Err(Error::BufferUnderrun {
                needed,
                remaining,
                position,
            }) => {
                assert_eq!(needed, 4);
                assert_eq!(remaining, 2);
                assert_eq!(position, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        // a failed read does not advance
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn mark_and_reset() {
        let data = [1, 2, 3, 4, 5];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(1).unwrap();

        let mark = cursor.mark();
        cursor.read_u16().unwrap();
        assert_eq!(cursor.consumed_since(mark), &[2, 3]);

        cursor.reset_to(mark);
        assert_eq!(cursor.position(), 1);
        assert_eq!(cursor.read_u8().unwrap(), 2);
    }

    #[test]
    fn read_slice_is_bounded() {
        let data = [1, 2, 3, 4];
        let mut cursor = ByteCursor::new(&data);

        let mut inner = cursor.read_slice(2).unwrap();
        assert_eq!(cursor.position(), 2);
        assert_eq!(inner.read_u16().unwrap(), 0x0102);
        assert!(inner.read_u8().is_err());
        assert_eq!(cursor.peek_remaining(), &[3, 4]);
    }
}
