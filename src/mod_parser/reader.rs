//! Forward-only byte cursor
//!
//! Every read checks the remaining length and reports a
//! [`FormatError::Truncated`] with the failing offset instead of panicking.

use crate::FormatError;

/// Forward-only reader over a borrowed byte buffer
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    /// Current offset from the start of the buffer
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left to read
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], FormatError> {
        let available = self.remaining();
        if count > available {
            return Err(FormatError::Truncated {
                offset: self.pos,
                needed: count,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + count];
        self.pos += count;
        Ok(slice)
    }

    /// Read a fixed-size array
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read one byte
    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a big-endian 16-bit word
    pub fn read_u16_be(&mut self) -> Result<u16, FormatError> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Skip `count` bytes
    pub fn skip(&mut self, count: usize) -> Result<(), FormatError> {
        self.read_bytes(count).map(|_| ())
    }

    /// Read a fixed-width, null-padded ASCII field
    ///
    /// Trailing NULs are trimmed; any other non-printable byte is replaced by a space.
    pub fn read_padded_string(&mut self, width: usize) -> Result<String, FormatError> {
        let raw = self.read_bytes(width)?;
        let end = raw.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(raw[..end]
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    ' '
                }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_big_endian_word() {
        let mut reader = ByteReader::new(&[0x12, 0x34]);
        assert_eq!(reader.read_u16_be().unwrap(), 0x1234);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn test_padded_string_trims_trailing_nuls() {
        let mut reader = ByteReader::new(b"kick\0\0\0\0");
        assert_eq!(reader.read_padded_string(8).unwrap(), "kick");
        assert_eq!(reader.position(), 8);
    }

    #[test]
    fn test_padded_string_replaces_control_bytes() {
        let mut reader = ByteReader::new(b"a\x01b\0");
        assert_eq!(reader.read_padded_string(4).unwrap(), "a b");
    }

    #[test]
    fn test_truncated_read_reports_offset() {
        let mut reader = ByteReader::new(&[1, 2, 3]);
        reader.skip(2).unwrap();
        let err = reader.read_u16_be().unwrap_err();
        assert_eq!(
            err,
            FormatError::Truncated {
                offset: 2,
                needed: 2,
                available: 1
            }
        );
        // A failed read does not move the cursor
        assert_eq!(reader.position(), 2);
    }
}
