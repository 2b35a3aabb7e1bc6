use std::borrow::Cow;
use std::io::Read;
use std::slice;

use byteorder::{LittleEndian, ReadBytesExt};
use time::PrimitiveDateTime;

use crate::consts;
use crate::datetime::datetime_from_bits;
use crate::error::Result;
use crate::folder::FolderReader;
use crate::string::read_null_terminated_bytes;

/// An iterator over the file entries in a cabinet or a folder.
#[derive(Clone)]
pub struct FileEntries<'a> {
    pub(crate) iter: slice::Iter<'a, FileEntry>,
    /// When set, only files belonging to this folder are yielded.
    pub(crate) folder_index: Option<u16>,
}

/// Metadata about one file stored in a cabinet.
#[derive(Debug, Clone)]
pub struct FileEntry {
    name: Vec<u8>,
    datetime: Option<PrimitiveDateTime>,
    uncompressed_size: u32,
    attributes: u16,
    pub(crate) folder_index: u16,
    pub(crate) uncompressed_offset: u32,
}

impl<'a> Iterator for FileEntries<'a> {
    type Item = &'a FileEntry;

    fn next(&mut self) -> Option<&'a FileEntry> {
        match self.folder_index {
            None => self.iter.next(),
            Some(index) => {
                self.iter.by_ref().find(|entry| entry.folder_index == index)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.folder_index {
            None => self.iter.size_hint(),
            Some(_) => (0, self.iter.size_hint().1),
        }
    }
}

impl FileEntry {
    /// Returns the name of the file, decoded lossily as UTF-8.  Names
    /// without the UTF attribute are in the legacy OEM code page, for which
    /// [`name_raw`](FileEntry::name_raw) gives the undecoded bytes.
    pub fn name(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.name)
    }

    /// Returns the stored name bytes, without the NUL terminator.
    pub fn name_raw(&self) -> &[u8] {
        &self.name
    }

    /// Returns the datetime for this file.  According to the CAB spec, this
    /// "is typically considered the 'last modified' time in local time, but
    /// the actual definition is application-defined."
    ///
    /// Note that this will return [`None`] if the datetime in the cabinet
    /// file was not a valid date/time.
    pub fn datetime(&self) -> Option<PrimitiveDateTime> {
        self.datetime
    }

    /// Returns the total size of the file when decompressed, in bytes.
    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    /// Returns true if this file has the "read-only" attribute set.
    pub fn is_read_only(&self) -> bool {
        (self.attributes & consts::ATTR_READ_ONLY) != 0
    }

    /// Returns true if this file has the "hidden" attribute set.
    pub fn is_hidden(&self) -> bool {
        (self.attributes & consts::ATTR_HIDDEN) != 0
    }

    /// Returns true if this file has the "system file" attribute set.
    pub fn is_system(&self) -> bool {
        (self.attributes & consts::ATTR_SYSTEM) != 0
    }

    /// Returns true if this file has the "archive" (modified since last
    /// backup) attribute set.
    pub fn is_archive(&self) -> bool {
        (self.attributes & consts::ATTR_ARCH) != 0
    }

    /// Returns true if this file has the "execute after extraction"
    /// attribute set.
    pub fn is_exec(&self) -> bool {
        (self.attributes & consts::ATTR_EXEC) != 0
    }

    /// Returns true if this file has the "name is UTF" attribute set.
    pub fn is_name_utf(&self) -> bool {
        (self.attributes & consts::ATTR_NAME_IS_UTF) != 0
    }
}

pub(crate) fn parse_file_entry<R: Read>(reader: &mut R) -> Result<FileEntry> {
    let uncompressed_size = reader.read_u32::<LittleEndian>()?;
    let uncompressed_offset = reader.read_u32::<LittleEndian>()?;
    let folder_index = reader.read_u16::<LittleEndian>()?;
    let date = reader.read_u16::<LittleEndian>()?;
    let time = reader.read_u16::<LittleEndian>()?;
    let datetime = datetime_from_bits(date, time);
    let attributes = reader.read_u16::<LittleEndian>()?;
    let name = read_null_terminated_bytes(reader)?;
    Ok(FileEntry {
        name,
        datetime,
        uncompressed_size,
        attributes,
        folder_index,
        uncompressed_offset,
    })
}

/// A reader for reading one file's decompressed data from a cabinet.  Each
/// one owns an independent decoding stream positioned at the file's start
/// and capped at its size.
#[derive(Debug)]
pub struct FileReader<'a> {
    pub(crate) reader: FolderReader<'a>,
    pub(crate) offset: u64,
    pub(crate) size: u64,
}

impl<'a> Read for FileReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        debug_assert!(self.offset <= self.size);
        let bytes_remaining = self.size - self.offset;
        let max_bytes = bytes_remaining.min(buf.len() as u64) as usize;
        if max_bytes == 0 {
            return Ok(0);
        }
        let bytes_read = self.reader.read(&mut buf[..max_bytes])?;
        self.offset += bytes_read as u64;
        Ok(bytes_read)
    }
}
