use std::io::Read;

use flate2::{FlushDecompress, Status};

use crate::datablock::DataBlockReader;
use crate::error::{Error, Result};

const MSZIP_SIGNATURE: [u8; 2] = *b"CK";
const DEFLATE_MAX_DICT_LEN: usize = 0x8000;

/// Remembers the last 32 KiB of bytes written through it, in time order.
/// The decoder mirrors every emitted byte here; when a block's DEFLATE
/// stream ends, the snapshot becomes the next block's dictionary.
#[derive(Debug)]
struct HistoryRing {
    buf: Vec<u8>,
    /// Index of the oldest byte once the buffer has filled.
    rotate: usize,
}

impl HistoryRing {
    fn new() -> HistoryRing {
        HistoryRing {
            buf: Vec::with_capacity(DEFLATE_MAX_DICT_LEN),
            rotate: 0,
        }
    }

    fn record(&mut self, mut bytes: &[u8]) {
        if bytes.len() > DEFLATE_MAX_DICT_LEN {
            bytes = &bytes[bytes.len() - DEFLATE_MAX_DICT_LEN..];
        }
        if self.buf.len() < DEFLATE_MAX_DICT_LEN {
            let room = DEFLATE_MAX_DICT_LEN - self.buf.len();
            let take = room.min(bytes.len());
            self.buf.extend_from_slice(&bytes[..take]);
            bytes = &bytes[take..];
        }
        for &byte in bytes {
            self.buf[self.rotate] = byte;
            self.rotate = (self.rotate + 1) % DEFLATE_MAX_DICT_LEN;
        }
    }

    fn snapshot(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.buf.len());
        out.extend_from_slice(&self.buf[self.rotate..]);
        out.extend_from_slice(&self.buf[..self.rotate]);
        out
    }

    fn clear(&mut self) {
        self.buf.clear();
        self.rotate = 0;
    }
}

/// A streaming reader over an MSZIP folder.  Each data block holds a `CK`
/// signature and one DEFLATE stream; the streams cooperate through a
/// dictionary of the previous block's output.  Compressed bytes are pulled
/// through the checksumming block readers a buffer at a time and inflated
/// directly into the caller's buffer; a block that inflates to nothing
/// rolls straight to the next one.
pub(crate) struct MsZipReader<'a> {
    blocks: Vec<DataBlockReader<'a>>,
    index: usize,
    inflater: flate2::Decompress,
    history: HistoryRing,
    dictionary: Vec<u8>,
    block_open: bool,
    /// Bytes inflated from the current block so far.
    block_produced: u64,
    input: [u8; 1024],
    input_start: usize,
    input_end: usize,
}

impl<'a> std::fmt::Debug for MsZipReader<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MsZipReader")
            .field("blocks", &self.blocks)
            .field("index", &self.index)
            .field("history", &self.history)
            .field("dictionary", &self.dictionary)
            .field("block_open", &self.block_open)
            .field("block_produced", &self.block_produced)
            .field("input_start", &self.input_start)
            .field("input_end", &self.input_end)
            .finish()
    }
}

impl<'a> MsZipReader<'a> {
    pub(crate) fn new(blocks: Vec<DataBlockReader<'a>>) -> MsZipReader<'a> {
        MsZipReader {
            blocks,
            index: 0,
            inflater: flate2::Decompress::new(false),
            history: HistoryRing::new(),
            dictionary: Vec::new(),
            block_open: false,
            block_produced: 0,
            input: [0; 1024],
            input_start: 0,
            input_end: 0,
        }
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        loop {
            if !self.block_open {
                if self.index >= self.blocks.len() {
                    return Ok(0);
                }
                self.open_block()?;
            }
            if self.input_start == self.input_end {
                self.input_start = 0;
                self.input_end =
                    self.blocks[self.index].fill(&mut self.input)?;
            }
            let input = &self.input[self.input_start..self.input_end];
            let before_in = self.inflater.total_in();
            let before_out = self.inflater.total_out();
            let status = self
                .inflater
                .decompress(input, buf, FlushDecompress::Sync)
                .map_err(|error| {
                    Error::invalid_mszip(format!("deflate error: {error}"))
                })?;
            let consumed = (self.inflater.total_in() - before_in) as usize;
            let produced = (self.inflater.total_out() - before_out) as usize;
            self.input_start += consumed;
            self.history.record(&buf[..produced]);
            self.block_produced += produced as u64;
            match status {
                Status::StreamEnd => self.finish_block()?,
                _ if consumed == 0 && produced == 0 => {
                    // No forward progress: the DEFLATE stream wants more
                    // input than the block has left.
                    if self.input_start == self.input_end {
                        return Err(Error::UnexpectedEof);
                    }
                    return Err(Error::invalid_mszip("deflate stream stalled"));
                }
                _ => {}
            }
            if produced > 0 {
                return Ok(produced);
            }
        }
    }

    fn open_block(&mut self) -> Result<()> {
        let block = &mut self.blocks[self.index];
        let mut signature = [0u8; 2];
        let mut have = 0;
        while have < signature.len() {
            let count = block.fill(&mut signature[have..])?;
            if count == 0 {
                return Err(Error::UnexpectedEof);
            }
            have += count;
        }
        if signature != MSZIP_SIGNATURE {
            return Err(Error::invalid_mszip("invalid block signature"));
        }
        self.inflater.reset(false);
        self.seed_dictionary()?;
        self.input_start = 0;
        self.input_end = 0;
        self.block_produced = 0;
        self.block_open = true;
        Ok(())
    }

    /// Pre-loads the previous block's output into the inflater by feeding
    /// it as a non-final stored DEFLATE block ahead of the real data,
    /// discarding the replayed bytes.
    fn seed_dictionary(&mut self) -> Result<()> {
        if self.dictionary.is_empty() {
            return Ok(());
        }
        debug_assert!(self.dictionary.len() <= DEFLATE_MAX_DICT_LEN);
        let length = self.dictionary.len() as u16;
        let mut chunk = Vec::with_capacity(self.dictionary.len() + 5);
        chunk.push(0x00);
        chunk.extend_from_slice(&length.to_le_bytes());
        chunk.extend_from_slice(&(!length).to_le_bytes());
        chunk.extend_from_slice(&self.dictionary);
        let mut offset = 0;
        let mut scratch = [0u8; 1024];
        while offset < chunk.len() {
            let before_in = self.inflater.total_in();
            self.inflater
                .decompress(&chunk[offset..], &mut scratch, FlushDecompress::Sync)
                .map_err(|error| {
                    Error::invalid_mszip(format!(
                        "dictionary replay failed: {error}"
                    ))
                })?;
            let consumed = (self.inflater.total_in() - before_in) as usize;
            if consumed == 0 {
                return Err(Error::invalid_mszip("dictionary replay stalled"));
            }
            offset += consumed;
        }
        Ok(())
    }

    fn finish_block(&mut self) -> Result<()> {
        let block = &mut self.blocks[self.index];
        if self.block_produced != u64::from(block.uncompressed_size()) {
            return Err(Error::invalid_mszip(format!(
                "incorrect uncompressed size (expected {}, was actually {})",
                block.uncompressed_size(),
                self.block_produced
            )));
        }
        block.close()?;
        self.index += 1;
        self.dictionary = self.history.snapshot();
        self.history.clear();
        self.block_open = false;
        Ok(())
    }
}

impl<'a> Read for MsZipReader<'a> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}
