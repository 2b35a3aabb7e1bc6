//! A streaming reader for [Windows
//! cabinet](https://en.wikipedia.org/wiki/Cabinet_(file_format)) (CAB)
//! files, with built-in MSZIP and LZX decompression.
//!
//! A cabinet groups its files into *folders*, each of which is one
//! compressed stream split across checksummed data blocks.  [`Cabinet::new`]
//! parses all of the metadata up front; file contents are decompressed
//! lazily, and every [`Cabinet::read_file`] call gets an independent
//! decoding stream.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::Read;
//!
//! let file = File::open("archive.cab")?;
//! let cabinet = mscab::Cabinet::new(file)?;
//! for entry in cabinet.file_entries() {
//!     println!("{} ({} bytes)", entry.name(), entry.uncompressed_size());
//! }
//! let mut contents = Vec::new();
//! cabinet.read_file("setup.inf")?.read_to_end(&mut contents)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Not supported: writing cabinets, Quantum compression, and following a
//! folder that continues into another cabinet of a spanned set.

#![warn(missing_docs)]

mod cabinet;
mod checksum;
mod consts;
mod ctype;
mod datablock;
mod datetime;
mod error;
mod file;
mod folder;
mod lzx;
mod mszip;
mod string;

pub use crate::cabinet::Cabinet;
pub use crate::ctype::CompressionType;
pub use crate::error::{Error, Result};
pub use crate::file::{FileEntries, FileEntry, FileReader};
pub use crate::folder::{FolderEntries, FolderEntry, FolderReader};
