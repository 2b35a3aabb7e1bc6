use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use tracing::debug;

use crate::consts;
use crate::datablock::parse_block_entry;
use crate::error::{Error, Result};
use crate::file::{parse_file_entry, FileEntries, FileEntry, FileReader};
use crate::folder::{
    parse_folder_record, FolderEntries, FolderReader, FolderRecord,
};
use crate::string::read_null_terminated_bytes;

pub(crate) trait ReadSeek: Read + Seek {}
impl<R: Read + Seek> ReadSeek for R {}

/// A structure for reading a cabinet file.
///
/// All metadata is parsed eagerly by [`Cabinet::new`]; file contents are
/// decompressed on demand, each [`read_file`](Cabinet::read_file) call
/// decoding its folder from the first block with its own window and
/// dictionary.
#[derive(Debug)]
pub struct Cabinet<R: ?Sized> {
    pub(crate) inner: CabinetInner<R>,
}

#[derive(Debug)]
pub(crate) struct CabinetInner<R: ?Sized> {
    cabinet_set_id: u16,
    cabinet_set_index: u16,
    reserve_data: Vec<u8>,
    prev_cabinet: Option<(Vec<u8>, Vec<u8>)>,
    next_cabinet: Option<(Vec<u8>, Vec<u8>)>,
    folders: Vec<FolderRecord>,
    files: Vec<FileEntry>,
    reader: RefCell<R>,
}

impl<R: Read + Seek> Cabinet<R> {
    /// Opens an existing cabinet file.
    pub fn new(mut reader: R) -> Result<Cabinet<R>> {
        Cabinet::parse(&mut reader).map(|inner| {
            let CabinetParse {
                cabinet_set_id,
                cabinet_set_index,
                reserve_data,
                prev_cabinet,
                next_cabinet,
                folders,
                files,
            } = inner;
            Cabinet {
                inner: CabinetInner {
                    cabinet_set_id,
                    cabinet_set_index,
                    reserve_data,
                    prev_cabinet,
                    next_cabinet,
                    folders,
                    files,
                    reader: RefCell::new(reader),
                },
            }
        })
    }

    fn parse(reader: &mut R) -> Result<CabinetParse> {
        match Cabinet::parse_inner(reader) {
            // A header or record cut short comes back from the byteorder
            // reads as a bare I/O error; surface it as the typed kind.
            Err(Error::Io(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                Err(Error::UnexpectedEof)
            }
            other => other,
        }
    }

    fn parse_inner(reader: &mut R) -> Result<CabinetParse> {
        let signature = reader.read_u32::<LittleEndian>()?;
        if signature != consts::FILE_SIGNATURE {
            return Err(Error::BadSignature);
        }
        let _reserved1 = reader.read_u32::<LittleEndian>()?;
        let _total_size = reader.read_u32::<LittleEndian>()?;
        let _reserved2 = reader.read_u32::<LittleEndian>()?;
        let first_file_offset = reader.read_u32::<LittleEndian>()?;
        let _reserved3 = reader.read_u32::<LittleEndian>()?;
        let minor_version = reader.read_u8()?;
        let major_version = reader.read_u8()?;
        if major_version != consts::VERSION_MAJOR
            || minor_version > consts::VERSION_MINOR
        {
            return Err(Error::UnsupportedVersion {
                major: major_version,
                minor: minor_version,
            });
        }
        let num_folders = reader.read_u16::<LittleEndian>()? as usize;
        let num_files = reader.read_u16::<LittleEndian>()?;
        let flags = reader.read_u16::<LittleEndian>()?;
        let cabinet_set_id = reader.read_u16::<LittleEndian>()?;
        let cabinet_set_index = reader.read_u16::<LittleEndian>()?;
        let mut header_reserve_size = 0u16;
        let mut folder_reserve_size = 0u8;
        let mut data_reserve_size = 0u8;
        if (flags & consts::FLAG_RESERVE_PRESENT) != 0 {
            header_reserve_size = reader.read_u16::<LittleEndian>()?;
            folder_reserve_size = reader.read_u8()?;
            data_reserve_size = reader.read_u8()?;
        }
        let mut header_reserve_data = vec![0u8; header_reserve_size as usize];
        if header_reserve_size > 0 {
            reader.read_exact(&mut header_reserve_data)?;
        }
        let prev_cabinet = if (flags & consts::FLAG_PREV_CABINET) != 0 {
            let cab_name = read_null_terminated_bytes(reader)?;
            let disk_name = read_null_terminated_bytes(reader)?;
            Some((cab_name, disk_name))
        } else {
            None
        };
        let next_cabinet = if (flags & consts::FLAG_NEXT_CABINET) != 0 {
            let cab_name = read_null_terminated_bytes(reader)?;
            let disk_name = read_null_terminated_bytes(reader)?;
            Some((cab_name, disk_name))
        } else {
            None
        };
        let mut folders = Vec::with_capacity(num_folders);
        for _ in 0..num_folders {
            let record =
                parse_folder_record(reader, folder_reserve_size as usize)?;
            folders.push(record);
        }
        // The data-block records live at each folder's declared offset;
        // walk them now so reads never have to rediscover block positions.
        for folder in folders.iter_mut() {
            reader.seek(SeekFrom::Start(u64::from(
                folder.first_data_block_offset,
            )))?;
            let num_blocks = folder.num_data_blocks as usize;
            let mut data_blocks = Vec::with_capacity(num_blocks);
            for _ in 0..num_blocks {
                data_blocks
                    .push(parse_block_entry(reader, data_reserve_size as usize)?);
            }
            folder.data_blocks = data_blocks;
        }
        reader.seek(SeekFrom::Start(u64::from(first_file_offset)))?;
        let mut files = Vec::with_capacity(num_files as usize);
        for _ in 0..num_files {
            let entry = parse_file_entry(reader)?;
            if entry.folder_index as usize >= folders.len() {
                return Err(Error::InvalidFolderReference {
                    index: entry.folder_index,
                    count: folders.len(),
                });
            }
            files.push(entry);
        }
        debug!(
            folders = folders.len(),
            files = files.len(),
            set_id = cabinet_set_id,
            "parsed cabinet"
        );
        Ok(CabinetParse {
            cabinet_set_id,
            cabinet_set_index,
            reserve_data: header_reserve_data,
            prev_cabinet,
            next_cabinet,
            folders,
            files,
        })
    }

    /// Returns the cabinet set ID for this cabinet (an arbitrary number
    /// used to group together a set of cabinets).
    pub fn cabinet_set_id(&self) -> u16 {
        self.inner.cabinet_set_id
    }

    /// Returns this cabinet's (zero-based) index within its cabinet set.
    pub fn cabinet_set_index(&self) -> u16 {
        self.inner.cabinet_set_index
    }

    /// Returns the application-defined reserve data stored in the cabinet
    /// header.
    pub fn reserve_data(&self) -> &[u8] {
        &self.inner.reserve_data
    }

    /// Returns the names of the previous cabinet file and disk in a spanned
    /// set, when the header declares one.
    pub fn previous_cabinet(&self) -> Option<(Cow<'_, str>, Cow<'_, str>)> {
        self.inner
            .prev_cabinet
            .as_ref()
            .map(|(cab, disk)| (lossy(cab), lossy(disk)))
    }

    /// Returns the names of the next cabinet file and disk in a spanned
    /// set, when the header declares one.
    pub fn next_cabinet(&self) -> Option<(Cow<'_, str>, Cow<'_, str>)> {
        self.inner
            .next_cabinet
            .as_ref()
            .map(|(cab, disk)| (lossy(cab), lossy(disk)))
    }

    /// Returns an iterator over the folder entries in this cabinet.
    pub fn folder_entries(&self) -> FolderEntries {
        FolderEntries {
            iter: self.inner.folders.iter().enumerate(),
            files: &self.inner.files,
        }
    }

    /// Returns an iterator over the file entries in this cabinet, in the
    /// order they appear in the file table.
    pub fn file_entries(&self) -> FileEntries {
        FileEntries { iter: self.inner.files.iter(), folder_index: None }
    }

    /// Returns the entry for the file with the given name, if any.
    pub fn get_file_entry(&self, name: &str) -> Option<&FileEntry> {
        self.inner.files.iter().find(|&file| file.name() == name)
    }

    /// Returns a reader over the decompressed data for the file in the
    /// cabinet with the given name.
    pub fn read_file(&self, name: &str) -> Result<FileReader<'_>> {
        match self.get_file_entry(name) {
            Some(entry) => self.read_file_entry(entry),
            None => Err(Error::FileNotFound(name.to_string())),
        }
    }

    /// Returns a reader over the decompressed data for the given file
    /// entry.  Every reader is independent: it decodes the folder from its
    /// first data block, discards up to the file's offset, and stops at the
    /// file's size.
    pub fn read_file_entry(&self, entry: &FileEntry) -> Result<FileReader<'_>> {
        let folder_index = entry.folder_index as usize;
        if folder_index >= self.inner.folders.len() {
            return Err(Error::InvalidFolderReference {
                index: entry.folder_index,
                count: self.inner.folders.len(),
            });
        }
        let mut reader = self.open_folder(folder_index)?;
        reader.skip(u64::from(entry.uncompressed_offset))?;
        Ok(FileReader {
            reader,
            offset: 0,
            size: u64::from(entry.uncompressed_size()),
        })
    }

    /// Returns a reader over the decompressed data of the folder at
    /// `index`, spanning all of its member files.
    pub fn read_folder(&self, index: usize) -> Result<FolderReader<'_>> {
        if index >= self.inner.folders.len() {
            return Err(Error::InvalidFolderReference {
                index: index as u16,
                count: self.inner.folders.len(),
            });
        }
        self.open_folder(index)
    }

    fn open_folder(&self, index: usize) -> Result<FolderReader<'_>> {
        let inner: &CabinetInner<dyn ReadSeek> = &self.inner;
        FolderReader::new(inner, &self.inner.folders[index])
    }
}

struct CabinetParse {
    cabinet_set_id: u16,
    cabinet_set_index: u16,
    reserve_data: Vec<u8>,
    prev_cabinet: Option<(Vec<u8>, Vec<u8>)>,
    next_cabinet: Option<(Vec<u8>, Vec<u8>)>,
    folders: Vec<FolderRecord>,
    files: Vec<FileEntry>,
}

fn lossy(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

impl<'a, R: ?Sized + Read> Read for &'a CabinetInner<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.reader.borrow_mut().read(buf)
    }
}

impl<'a, R: ?Sized + Seek> Seek for &'a CabinetInner<R> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.reader.borrow_mut().seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use super::Cabinet;
    use crate::error::Error;

    #[test]
    fn read_uncompressed_cabinet_with_one_file() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x01\0hi.txt\0\
            \x4c\x1a\x2e\x7f\x0e\0\x0e\0Hello, world!\n";
        assert_eq!(binary.len(), 0x59);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        assert_eq!(cabinet.cabinet_set_id(), 0x1234);
        assert_eq!(cabinet.cabinet_set_index(), 0);
        assert_eq!(cabinet.reserve_data(), &[]);
        assert_eq!(cabinet.folder_entries().len(), 1);
        assert!(cabinet.previous_cabinet().is_none());
        assert!(cabinet.next_cabinet().is_none());
        {
            let file = cabinet.get_file_entry("hi.txt").unwrap();
            assert_eq!(file.name(), "hi.txt");
            assert!(!file.is_name_utf());
            assert!(file.is_read_only());
            let dt = file.datetime().unwrap();
            assert_eq!(dt.year(), 1997);
            assert_eq!(dt.month(), time::Month::March);
            assert_eq!(dt.day(), 12);
            assert_eq!(dt.hour(), 11);
            assert_eq!(dt.minute(), 13);
            assert_eq!(dt.second(), 52);
        }

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");
    }

    #[test]
    fn read_uncompressed_cabinet_with_two_files() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x80\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x02\0\0\0\x34\x12\0\0\
            \x5b\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xe7\x59\x01\0hi.txt\0\
            \x0f\0\0\0\x0e\0\0\0\0\0\x6c\x22\xe7\x59\x01\0bye.txt\0\
            \0\0\0\0\x1d\0\x1d\0Hello, world!\nSee you later!\n";
        assert_eq!(binary.len(), 0x80);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\nSee you later!\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let mut data = Vec::new();
        cabinet.read_file("bye.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"See you later!\n");
    }

    #[test]
    fn read_uncompressed_cabinet_with_two_data_blocks() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x61\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x02\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x01\0hi.txt\0\
            \0\0\0\0\x06\0\x06\0Hello,\
            \0\0\0\0\x08\0\x08\0 world!\n";
        assert_eq!(binary.len(), 0x61);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        assert_eq!(cabinet.folder_entries().len(), 1);
        assert_eq!(
            cabinet.folder_entries().next().unwrap().num_data_blocks(),
            2
        );

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");
    }

    #[test]
    fn read_mszip_cabinet_with_one_file() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x61\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\x01\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xe7\x59\x01\0hi.txt\0\
            \0\0\0\0\x16\0\x0e\0\
            CK\xf3H\xcd\xc9\xc9\xd7Q(\xcf/\xcaIQ\xe4\x02\x00$\xf2\x04\x94";
        assert_eq!(binary.len(), 0x61);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        assert_eq!(cabinet.cabinet_set_id(), 0x1234);
        assert_eq!(cabinet.folder_entries().len(), 1);

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");
    }

    #[test]
    fn read_mszip_cabinet_with_two_files() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x88\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x02\0\0\0\x34\x12\0\0\
            \x5b\0\0\0\x01\0\x01\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xe7\x59\x01\0hi.txt\0\
            \x0f\0\0\0\x0e\0\0\0\0\0\x6c\x22\xe7\x59\x01\0bye.txt\0\
            \0\0\0\0\x25\0\x1d\0CK\xf3H\xcd\xc9\xc9\xd7Q(\xcf/\xcaIQ\xe4\
            \nNMU\xa8\xcc/U\xc8I,I-R\xe4\x02\x00\x93\xfc\t\x91";
        assert_eq!(binary.len(), 0x88);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\nSee you later!\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\n");

        let mut data = Vec::new();
        cabinet.read_file("bye.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"See you later!\n");
    }

    #[test]
    fn read_lzx_cabinet_with_two_files() {
        let binary: &[u8] =
            b"\x4d\x53\x43\x46\x00\x00\x00\x00\x97\x00\x00\x00\x00\x00\x00\
            \x00\x2c\x00\x00\x00\x00\x00\x00\x00\x03\x01\x01\x00\x02\x00\
            \x00\x00\x2d\x05\x00\x00\x5b\x00\x00\x00\x01\x00\x03\x13\x0f\
            \x00\x00\x00\x00\x00\x00\x00\x00\x00\x21\x53\x0d\xb2\x20\x00\
            \x68\x69\x2e\x74\x78\x74\x00\x10\x00\x00\x00\x0f\x00\x00\x00\
            \x00\x00\x21\x53\x0b\xb2\x20\x00\x62\x79\x65\x2e\x74\x78\x74\
            \x00\x5c\xef\x2a\xc7\x34\x00\x1f\x00\x5b\x80\x80\x8d\x00\x30\
            \xf0\x01\x10\x00\x00\x00\x01\x00\x00\x00\x01\x00\x00\x00\x48\
            \x65\x6c\x6c\x6f\x2c\x20\x77\x6f\x72\x6c\x64\x21\x0d\x0a\x53\
            \x65\x65\x20\x79\x6f\x75\x20\x6c\x61\x74\x65\x72\x21\x0d\x0a\
            \x00";
        assert_eq!(binary.len(), 0x97);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        match cabinet.folder_entries().next().unwrap().compression_type() {
            crate::CompressionType::Lzx(19) => {}
            other => panic!("unexpected compression type: {other:?}"),
        }

        let mut data = Vec::new();
        cabinet.read_folder(0).unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\r\nSee you later!\r\n");

        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Hello, world!\r\n");

        let mut data = Vec::new();
        cabinet.read_file("bye.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"See you later!\r\n");
    }

    #[test]
    fn read_uncompressed_cabinet_with_non_ascii_filename() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x55\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\0\0\0\0\
            \x44\0\0\0\x01\0\0\0\
            \x09\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\xa0\0\xe2\x98\x83.txt\0\
            \x3d\x0f\x08\x56\x09\0\x09\0Snowman!\n";
        assert_eq!(binary.len(), 0x55);
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        {
            let file_entry = cabinet.get_file_entry("\u{2603}.txt").unwrap();
            assert_eq!(file_entry.name(), "\u{2603}.txt");
            assert_eq!(file_entry.name_raw(), "\u{2603}.txt".as_bytes());
            assert!(file_entry.is_name_utf());
        }
        {
            let mut file_reader = cabinet.read_file("\u{2603}.txt").unwrap();
            let mut data = Vec::new();
            file_reader.read_to_end(&mut data).unwrap();
            assert_eq!(data, b"Snowman!\n");
        }
    }

    #[test]
    fn bad_signature_is_rejected() {
        let binary: &[u8] = b"MSCG\0\0\0\0\x59\0\0\0\0\0\0\0";
        match Cabinet::new(Cursor::new(binary)) {
            Err(Error::BadSignature) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn unsupported_version_is_rejected() {
        // Same as the single-file cabinet, but claiming version 2.1.
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x01\x02\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\0\0";
        match Cabinet::new(Cursor::new(binary)) {
            Err(Error::UnsupportedVersion { major: 2, minor: 1 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn out_of_range_folder_index_is_rejected() {
        // One folder, but the file entry claims folder 7.
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\x07\0\x6c\x22\xba\x59\x01\0hi.txt\0\
            \x4c\x1a\x2e\x7f\x0e\0\x0e\0Hello, world!\n";
        match Cabinet::new(Cursor::new(binary)) {
            Err(Error::InvalidFolderReference { index: 7, count: 1 }) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn truncated_header_is_unexpected_eof() {
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0";
        match Cabinet::new(Cursor::new(binary)) {
            Err(Error::UnexpectedEof) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn corrupted_data_block_fails_checksum_verification() {
        // The single-file cabinet with one payload byte flipped
        // ("Hello" -> "Jello").
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x01\0hi.txt\0\
            \x4c\x1a\x2e\x7f\x0e\0\x0e\0Jello, world!\n";
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        let mut data = Vec::new();
        let result = cabinet
            .read_file("hi.txt")
            .unwrap()
            .read_to_end(&mut data)
            .map_err(|err| err.kind());
        assert_eq!(result.unwrap_err(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn zeroed_checksum_skips_verification() {
        // Same corrupted payload, but the block opts out of checksums.
        let binary: &[u8] = b"MSCF\0\0\0\0\x59\0\0\0\0\0\0\0\
            \x2c\0\0\0\0\0\0\0\x03\x01\x01\0\x01\0\0\0\x34\x12\0\0\
            \x43\0\0\0\x01\0\0\0\
            \x0e\0\0\0\0\0\0\0\0\0\x6c\x22\xba\x59\x01\0hi.txt\0\
            \0\0\0\0\x0e\0\x0e\0Jello, world!\n";
        let cabinet = Cabinet::new(Cursor::new(binary)).unwrap();
        let mut data = Vec::new();
        cabinet.read_file("hi.txt").unwrap().read_to_end(&mut data).unwrap();
        assert_eq!(data, b"Jello, world!\n");
    }
}
