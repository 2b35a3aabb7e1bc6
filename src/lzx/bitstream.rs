use std::io::Read;

use crate::error::{Error, Result};

/// A bit reader over little-endian 16-bit words, delivering bits MSB-first
/// within each word.  This is the bit order LZX uses for everything except
/// the raw byte regions of uncompressed blocks.
#[derive(Debug)]
pub(crate) struct BitStream<R> {
    inner: R,
    cache: u64,
    cache_size: u32,
}

impl<R: Read> BitStream<R> {
    pub(crate) fn new(inner: R) -> BitStream<R> {
        BitStream { inner, cache: 0, cache_size: 0 }
    }

    /// Returns the next `count` bits without consuming them, refilling the
    /// cache one 16-bit word at a time.  `count` must be at most 32.
    pub(crate) fn peek(&mut self, count: u32) -> Result<u32> {
        debug_assert!(count <= 32);
        while self.cache_size < count {
            let mut word = [0u8; 2];
            match self.inner.read_exact(&mut word) {
                Ok(()) => {}
                Err(ref err)
                    if err.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Err(Error::UnexpectedEof);
                }
                Err(err) => return Err(Error::Io(err)),
            }
            let word = u64::from(word[1]) << 8 | u64::from(word[0]);
            self.cache = self.cache << 16 | word;
            self.cache_size += 16;
        }
        Ok((self.cache >> (self.cache_size - count)) as u32)
    }

    /// Consumes `count` bits.
    pub(crate) fn read(&mut self, count: u32) -> Result<u32> {
        let bits = self.peek(count)?;
        self.cache_size -= count;
        self.cache &= (1u64 << self.cache_size) - 1;
        Ok(bits)
    }

    /// Discards cached bits down to the previous 16-bit word boundary.
    /// Never reads new data.
    pub(crate) fn align(&mut self) {
        self.cache_size -= self.cache_size % 16;
        self.cache &= (1u64 << self.cache_size) - 1;
    }

    pub(crate) fn bits_left(&self) -> u32 {
        self.cache_size
    }

    /// Reads raw bytes at a 16-bit word boundary, for the literal regions of
    /// uncompressed blocks.  Callers align first; the refill discipline
    /// leaves the cache empty after that, so the bytes come straight from
    /// the source.
    pub(crate) fn read_aligned_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        debug_assert_eq!(self.bits_left(), 0);
        match self.inner.read_exact(buf) {
            Ok(()) => Ok(()),
            Err(ref err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(Error::UnexpectedEof)
            }
            Err(err) => Err(Error::Io(err)),
        }
    }
}
