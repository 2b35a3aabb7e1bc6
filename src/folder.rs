use std::io::Read;
use std::slice;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::cabinet::{CabinetInner, ReadSeek};
use crate::ctype::CompressionType;
use crate::datablock::{ConcatReader, DataBlockEntry, DataBlockReader};
use crate::error::{Error, Result};
use crate::file::{FileEntries, FileEntry};
use crate::lzx::{IntelReader, LzxReader};
use crate::mszip::MsZipReader;

/// An iterator over the folder entries in a cabinet.
#[derive(Clone)]
pub struct FolderEntries<'a> {
    pub(crate) iter: std::iter::Enumerate<slice::Iter<'a, FolderRecord>>,
    pub(crate) files: &'a [FileEntry],
}

/// Metadata about one folder in a cabinet.
pub struct FolderEntry<'a> {
    index: usize,
    record: &'a FolderRecord,
    files: &'a [FileEntry],
}

#[derive(Debug)]
pub(crate) struct FolderRecord {
    pub(crate) first_data_block_offset: u32,
    pub(crate) num_data_blocks: u16,
    pub(crate) compression_type: CompressionType,
    pub(crate) reserve_data: Vec<u8>,
    pub(crate) data_blocks: Vec<DataBlockEntry>,
}

impl<'a> Iterator for FolderEntries<'a> {
    type Item = FolderEntry<'a>;

    fn next(&mut self) -> Option<FolderEntry<'a>> {
        let (index, record) = self.iter.next()?;
        Some(FolderEntry { index, record, files: self.files })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}

impl<'a> ExactSizeIterator for FolderEntries<'a> {}

impl<'a> FolderEntry<'a> {
    /// Returns the scheme used to compress this folder's data.
    pub fn compression_type(&self) -> CompressionType {
        self.record.compression_type
    }

    /// Returns the number of data blocks used to store this folder's data.
    pub fn num_data_blocks(&self) -> u16 {
        self.record.num_data_blocks
    }

    /// Returns the application-defined reserve data for this folder.
    pub fn reserve_data(&self) -> &[u8] {
        &self.record.reserve_data
    }

    /// Returns an iterator over the file entries in this folder.
    pub fn file_entries(&self) -> FileEntries<'a> {
        FileEntries {
            iter: self.files.iter(),
            folder_index: Some(self.index as u16),
        }
    }
}

pub(crate) fn parse_folder_record<R: Read>(
    reader: &mut R,
    reserve_size: usize,
) -> Result<FolderRecord> {
    let first_data_offset = reader.read_u32::<LittleEndian>()?;
    let num_data_blocks = reader.read_u16::<LittleEndian>()?;
    let compression_bits = reader.read_u16::<LittleEndian>()?;
    let compression_type = CompressionType::from_bitfield(compression_bits)?;
    let mut reserve_data = vec![0u8; reserve_size];
    if reserve_size > 0 {
        reader.read_exact(&mut reserve_data)?;
    }
    Ok(FolderRecord {
        first_data_block_offset: first_data_offset,
        num_data_blocks,
        compression_type,
        reserve_data,
        data_blocks: Vec::new(),
    })
}

/// One decompression stream over a folder's data blocks.  The codec is
/// picked by the folder header; every shape ends in the same chain of
/// checksumming data-block readers.
#[derive(Debug)]
enum FolderDecompressor<'a> {
    Uncompressed(ConcatReader<'a>),
    MsZip(MsZipReader<'a>),
    Lzx(IntelReader<ConcatReader<'a>>),
}

/// A reader for reading decompressed data from a cabinet folder.  The
/// stream spans every member file, in folder order.
#[derive(Debug)]
pub struct FolderReader<'a> {
    decompressor: FolderDecompressor<'a>,
    /// Uncompressed bytes left in the folder stream.
    remaining: u64,
    /// First decode error, repeated by every later read.
    failed: Option<Error>,
}

impl<'a> FolderReader<'a> {
    pub(crate) fn new(
        source: &'a CabinetInner<dyn ReadSeek + 'a>,
        folder: &FolderRecord,
    ) -> Result<FolderReader<'a>> {
        let mut blocks = Vec::with_capacity(folder.data_blocks.len());
        let mut total: u64 = 0;
        for entry in &folder.data_blocks {
            total += u64::from(entry.uncompressed_size);
            blocks.push(DataBlockReader::new(source, entry)?);
        }
        let decompressor = match folder.compression_type {
            CompressionType::None => {
                FolderDecompressor::Uncompressed(ConcatReader::new(blocks))
            }
            CompressionType::MsZip => {
                FolderDecompressor::MsZip(MsZipReader::new(blocks))
            }
            CompressionType::Quantum(_, _) => {
                return Err(Error::UnsupportedCompression);
            }
            CompressionType::Lzx(window_exponent) => {
                let lzx =
                    LzxReader::new(ConcatReader::new(blocks), window_exponent, 0);
                FolderDecompressor::Lzx(IntelReader::new(lzx))
            }
        };
        Ok(FolderReader { decompressor, remaining: total, failed: None })
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if let Some(error) = &self.failed {
            return Err(error.clone());
        }
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let max = self.remaining.min(buf.len() as u64) as usize;
        let result = match &mut self.decompressor {
            FolderDecompressor::Uncompressed(reader) => {
                reader.fill(&mut buf[..max])
            }
            FolderDecompressor::MsZip(reader) => reader.fill(&mut buf[..max]),
            FolderDecompressor::Lzx(reader) => reader.fill(&mut buf[..max]),
        };
        match result {
            Ok(count) => {
                self.remaining -= count as u64;
                Ok(count)
            }
            Err(error) => {
                self.failed = Some(error.clone());
                Err(error)
            }
        }
    }

    /// Reads and discards `count` bytes, for positioning at a file's start.
    pub(crate) fn skip(&mut self, mut count: u64) -> Result<()> {
        let mut scratch = [0u8; 4096];
        while count > 0 {
            let max = count.min(scratch.len() as u64) as usize;
            let read = self.fill(&mut scratch[..max])?;
            if read == 0 {
                return Err(Error::UnexpectedEof);
            }
            count -= read as u64;
        }
        Ok(())
    }
}

impl<'a> Read for FolderReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}
