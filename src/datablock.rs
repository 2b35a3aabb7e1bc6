use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::cabinet::{CabinetInner, ReadSeek};
use crate::checksum::Checksum;
use crate::error::{Error, Result};

/// Metadata for one data block within a folder, parsed up front; the
/// compressed payload stays in the source and is read on demand.
#[derive(Debug, Clone)]
pub(crate) struct DataBlockEntry {
    pub(crate) checksum: u32,
    pub(crate) compressed_size: u16,
    pub(crate) uncompressed_size: u16,
    pub(crate) reserve_data: Vec<u8>,
    /// Absolute offset of the compressed payload in the source.
    pub(crate) data_offset: u64,
}

pub(crate) fn parse_block_entry<R: Read + Seek>(
    reader: &mut R,
    data_reserve_size: usize,
) -> Result<DataBlockEntry> {
    let checksum = reader.read_u32::<LittleEndian>()?;
    let compressed_size = reader.read_u16::<LittleEndian>()?;
    let uncompressed_size = reader.read_u16::<LittleEndian>()?;
    let mut reserve_data = vec![0u8; data_reserve_size];
    if data_reserve_size > 0 {
        reader.read_exact(&mut reserve_data)?;
    }
    let data_offset = reader.stream_position()?;
    reader.seek(SeekFrom::Current(i64::from(compressed_size)))?;
    Ok(DataBlockEntry {
        checksum,
        compressed_size,
        uncompressed_size,
        reserve_data,
        data_offset,
    })
}

/// A reader over one block's compressed payload.  Every delivered byte also
/// feeds the checksum when the block carries one; `close` finishes and
/// verifies it.  The shared source is repositioned before each read, so any
/// number of block readers can coexist.
pub(crate) struct DataBlockReader<'a> {
    source: &'a CabinetInner<dyn ReadSeek + 'a>,
    entry: DataBlockEntry,
    /// Stored checksum still awaiting verification; cleared once verified.
    expected: u32,
    pos: u64,
    checksum: Checksum,
}

impl<'a> std::fmt::Debug for DataBlockReader<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataBlockReader")
            .field("entry", &self.entry)
            .field("expected", &self.expected)
            .field("pos", &self.pos)
            .field("checksum", &self.checksum)
            .finish()
    }
}

impl<'a> DataBlockReader<'a> {
    /// Fails with `ContinuationUnsupported` for a block whose uncompressed
    /// size is zero: that marks a block continued in the next cabinet of a
    /// spanned set.
    pub(crate) fn new(
        source: &'a CabinetInner<dyn ReadSeek + 'a>,
        entry: &DataBlockEntry,
    ) -> Result<DataBlockReader<'a>> {
        if entry.uncompressed_size == 0 {
            return Err(Error::ContinuationUnsupported);
        }
        Ok(DataBlockReader {
            source,
            entry: entry.clone(),
            expected: entry.checksum,
            pos: 0,
            checksum: Checksum::new(),
        })
    }

    pub(crate) fn uncompressed_size(&self) -> u16 {
        self.entry.uncompressed_size
    }

    fn remaining(&self) -> u64 {
        u64::from(self.entry.compressed_size) - self.pos
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        let remaining = self.remaining();
        if remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = remaining.min(buf.len() as u64) as usize;
        let mut source = self.source;
        source.seek(SeekFrom::Start(self.entry.data_offset + self.pos))?;
        let count = source.read(&mut buf[..max])?;
        if count == 0 {
            return Err(Error::UnexpectedEof);
        }
        self.pos += count as u64;
        if self.expected != 0 {
            self.checksum.update(&buf[..count]);
        }
        Ok(count)
    }

    /// Verifies the block checksum.  The checksum covers the payload, then
    /// the header fields other than the checksum itself, then the per-block
    /// reserve bytes, with the tail folded at each phase boundary.  Unread
    /// payload is drained first so an early close still verifies.
    pub(crate) fn close(&mut self) -> Result<()> {
        if self.expected == 0 {
            return Ok(());
        }
        let mut scratch = [0u8; 512];
        while self.remaining() > 0 {
            self.fill(&mut scratch)?;
        }
        self.checksum.flush();
        self.checksum.update(&self.entry.compressed_size.to_le_bytes());
        self.checksum.update(&self.entry.uncompressed_size.to_le_bytes());
        self.checksum.update(&self.entry.reserve_data);
        self.checksum.flush();
        let actual = self.checksum.value();
        if actual != self.expected {
            return Err(Error::ChecksumMismatch {
                expected: self.expected,
                actual,
            });
        }
        self.expected = 0;
        Ok(())
    }
}

impl<'a> Read for DataBlockReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}

/// Chains a folder's data-block readers into one compressed stream.  Each
/// exhausted block is closed (verifying its checksum) before the next one
/// is opened, and a zero-length block never surfaces as a spurious
/// zero-byte read.
#[derive(Debug)]
pub(crate) struct ConcatReader<'a> {
    blocks: Vec<DataBlockReader<'a>>,
    index: usize,
}

impl<'a> ConcatReader<'a> {
    pub(crate) fn new(blocks: Vec<DataBlockReader<'a>>) -> ConcatReader<'a> {
        ConcatReader { blocks, index: 0 }
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.index < self.blocks.len() {
            let block = &mut self.blocks[self.index];
            let count = block.fill(buf)?;
            // Close as soon as the payload is exhausted, so the final
            // block of a folder is verified even when the caller never
            // reads past the end of the stream.
            if block.remaining() == 0 {
                block.close()?;
                self.index += 1;
            }
            if count > 0 {
                return Ok(count);
            }
        }
        Ok(0)
    }
}

impl<'a> Read for ConcatReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}
