/*
    REFERENCES
    ----------

    1. https://github.com/shaka-project/shaka-player/blob/f539147d480fff9cc8d685f3aac0e6f5dc28a182/lib/util/data_view_reader.js

*/

use std::io::{Cursor, Error, ErrorKind, Read, Result};

/// Big endian reader over an owned byte buffer.
#[derive(Clone, Default)]
pub struct Reader {
    inner: Cursor<Vec<u8>>,
}

impl Reader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
        }
    }

    pub fn has_more_data(&self) -> bool {
        self.inner.position() < self.get_length()
    }

    pub fn get_length(&self) -> u64 {
        self.inner.get_ref().len() as u64
    }

    pub fn get_position(&self) -> u64 {
        self.inner.position()
    }

    pub fn skip(&mut self, bytes: u64) -> Result<()> {
        let position = self.get_position() + bytes;

        if position > self.get_length() {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                "Reader skips out of memory bounds.",
            ));
        }

        self.inner.set_position(position);
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0; 1];
        self.inner.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0; 4];
        self.inner.read_exact(&mut buf)?;
        Ok(u32::from_be_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0; 8];
        self.inner.read_exact(&mut buf)?;
        Ok(u64::from_be_bytes(buf))
    }

    pub fn read_bytes_u8(&mut self, bytes: usize) -> Result<Vec<u8>> {
        let remaining = self.get_length() - self.get_position();

        if bytes as u64 > remaining {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("Requested {} bytes but only {} are left.", bytes, remaining),
            ));
        }

        let mut buf = vec![0; bytes];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_big_endian() {
        let mut reader = Reader::new(vec![0, 0, 0, 42, 7, 1, 2]);
        assert_eq!(reader.read_u32().unwrap(), 42);
        assert_eq!(reader.read_u8().unwrap(), 7);
        assert!(reader.has_more_data());
        assert_eq!(reader.read_bytes_u8(2).unwrap(), vec![1, 2]);
        assert!(!reader.has_more_data());
    }

    #[test]
    fn test_read_past_end() {
        let mut reader = Reader::new(vec![1, 2]);
        assert!(reader.read_bytes_u8(usize::MAX).is_err());
        assert!(reader.skip(3).is_err());
        assert_eq!(reader.get_position(), 0);
    }
}
