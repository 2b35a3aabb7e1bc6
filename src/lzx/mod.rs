//! The LZX decompressor.
//!
//! LZX is a block-structured LZ77+Huffman scheme: a main tree covering
//! literals and match headers, a secondary tree for long match lengths, an
//! optional aligned-offset tree feeding the low three bits of large offsets,
//! three recent-offset registers, and an optional whole-stream rewrite of
//! x86 `E8` call displacements.  Microsoft documents the format in
//! [MS-PATCH]; a few places where the documentation disagrees with shipped
//! encoders follow the behaviour of real cabinet files.
//!
//! [MS-PATCH]: https://learn.microsoft.com/en-us/previous-versions/bb417343(v=msdn.10)

mod bitstream;
mod intel;
mod tree;
#[cfg(test)]
pub(crate) mod testutil;
mod window;

use std::io::Read;

use tracing::debug;

use crate::error::{Error, Result};

use bitstream::BitStream;
use tree::Tree;
use window::SlidingWindow;

pub(crate) use intel::IntelReader;

/// The exponent of the smallest allowed window size.
pub(crate) const MIN_WINDOW_EXPONENT: u8 = 15;
/// The exponent of the largest allowed window size.
pub(crate) const MAX_WINDOW_EXPONENT: u8 = 21;

/// Number of literal symbols at the bottom of the main tree.
const NUM_CHARS: usize = 256;
/// Number of symbols in the match-length tree.
const LENGTH_TREE_SIZE: usize = 249;
/// Number of symbols in the aligned-offset tree.
const ALIGNED_TREE_SIZE: usize = 8;
/// Width of the raw code lengths of the aligned-offset tree.
const ALIGNED_TREE_LENGTH_BITS: u32 = 3;
/// Match-length values encoded directly in the main element.
const NUM_PRIMARY_LENGTHS: usize = 7;
/// Matches are at least this long.
const MIN_MATCH: usize = 2;

/// Position slots per window exponent 15..=21.
const POSITION_SLOTS: [usize; 7] = [30, 32, 34, 36, 38, 42, 50];

/// Extra offset bits carried by each position slot.
const fn extra_bits(slot: usize) -> u32 {
    if slot < 4 {
        0
    } else if slot < 36 {
        (slot as u32 / 2) - 1
    } else {
        17
    }
}

/// Base offset of each position slot; `offset = base + extra - 2`.
const POSITION_BASE: [u32; 50] = {
    let mut base = [0u32; 50];
    let mut slot = 1;
    while slot < base.len() {
        base[slot] = base[slot - 1] + (1 << extra_bits(slot - 1));
        slot += 1;
    }
    base
};

fn position_slots(window_exponent: u8) -> usize {
    POSITION_SLOTS[(window_exponent - MIN_WINDOW_EXPONENT) as usize]
}

/// The three recent-offset registers.  Slots 0..=2 of a match reuse these;
/// slot 1 and 2 swap the reused value to the front, while an explicit
/// offset shifts all three.
#[derive(Debug)]
struct Registers {
    r0: u32,
    r1: u32,
    r2: u32,
}

impl Registers {
    fn new() -> Registers {
        Registers { r0: 1, r1: 1, r2: 1 }
    }

    fn push(&mut self, offset: u32) {
        self.r2 = self.r1;
        self.r1 = self.r0;
        self.r0 = offset;
    }
}

#[derive(Debug)]
enum Block {
    Uncompressed { remaining: u32, odd: bool },
    Compressed {
        main: Tree,
        length: Tree,
        aligned: Option<Tree>,
        remaining: u32,
    },
}

/// A streaming LZX decoder over the concatenated data blocks of a folder.
///
/// Tree code lengths, the recent-offset registers, the sliding window and
/// the x86-translation state all persist across blocks; only the lookup
/// tables are rebuilt per block.
#[derive(Debug)]
pub(crate) struct LzxReader<R> {
    stream: BitStream<R>,
    window: SlidingWindow,
    registers: Registers,
    main_lengths: Vec<u8>,
    length_lengths: Vec<u8>,
    intel_file_size: u32,
    intel_started: bool,
    header_read: bool,
    reset_interval: u64,
    /// Bytes decoded and delivered so far.
    processed: u64,
    block: Option<Block>,
    /// Decoded bytes resident in the window but not yet delivered.
    pending: usize,
}

impl<R: Read> LzxReader<R> {
    /// Creates a decoder with a window of `1 << window_exponent` bytes.
    /// `reset_interval` is the cadence (in decoded bytes) at which the bit
    /// stream is re-aligned between elements; cabinet folders use 0 (never).
    pub(crate) fn new(
        inner: R,
        window_exponent: u8,
        reset_interval: u64,
    ) -> LzxReader<R> {
        debug_assert!(
            (MIN_WINDOW_EXPONENT..=MAX_WINDOW_EXPONENT)
                .contains(&window_exponent)
        );
        let main_tree_size =
            NUM_CHARS + 8 * position_slots(window_exponent);
        LzxReader {
            stream: BitStream::new(inner),
            window: SlidingWindow::new(1usize << window_exponent),
            registers: Registers::new(),
            main_lengths: vec![0; main_tree_size],
            length_lengths: vec![0; LENGTH_TREE_SIZE],
            intel_file_size: 0,
            intel_started: false,
            header_read: false,
            reset_interval,
            processed: 0,
            block: None,
            pending: 0,
        }
    }

    pub(crate) fn intel_active(&self) -> bool {
        self.intel_file_size != 0 && self.intel_started
    }

    pub(crate) fn intel_file_size(&self) -> u32 {
        self.intel_file_size
    }

    /// The stream prologue: one bit announcing x86 call translation, and
    /// when set, the translation size as two 16-bit halves, high half first.
    fn read_stream_header(&mut self) -> Result<()> {
        if self.stream.read(1)? != 0 {
            let high = self.stream.read(16)?;
            let low = self.stream.read(16)?;
            self.intel_file_size = high << 16 | low;
            debug!(
                intel_file_size = self.intel_file_size,
                "lzx stream has x86 call translation"
            );
        }
        self.header_read = true;
        Ok(())
    }

    fn read_block_header(&mut self) -> Result<Block> {
        let block_type = self.stream.read(3)?;
        let block_size = self.stream.read(24)?;
        debug!(block_type, block_size, "lzx block");
        match block_type {
            1 | 2 => {
                let aligned = if block_type == 2 {
                    Some(Tree::read_direct(
                        &mut self.stream,
                        ALIGNED_TREE_LENGTH_BITS,
                        ALIGNED_TREE_SIZE,
                    )?)
                } else {
                    None
                };
                // The main tree's lengths arrive as two pre-tree intervals:
                // the literal alphabet, then the match alphabet.
                Tree::update_lengths(
                    &mut self.stream,
                    &mut self.main_lengths[..NUM_CHARS],
                )?;
                Tree::update_lengths(
                    &mut self.stream,
                    &mut self.main_lengths[NUM_CHARS..],
                )?;
                let main = Tree::from_lengths(self.main_lengths.clone())?;
                if self.main_lengths[0xe8] != 0 {
                    self.intel_started = true;
                }
                Tree::update_lengths(
                    &mut self.stream,
                    &mut self.length_lengths,
                )?;
                let length = Tree::from_lengths(self.length_lengths.clone())?;
                Ok(Block::Compressed {
                    main,
                    length,
                    aligned,
                    remaining: block_size,
                })
            }
            3 => {
                self.stream.align();
                let mut values = [0u8; 12];
                self.stream.read_aligned_bytes(&mut values)?;
                self.registers.r0 =
                    u32::from_le_bytes(values[0..4].try_into().unwrap());
                self.registers.r1 =
                    u32::from_le_bytes(values[4..8].try_into().unwrap());
                self.registers.r2 =
                    u32::from_le_bytes(values[8..12].try_into().unwrap());
                self.intel_started = true;
                Ok(Block::Uncompressed {
                    remaining: block_size,
                    odd: block_size % 2 == 1,
                })
            }
            other => Err(Error::invalid_block(format!(
                "invalid block type {other}"
            ))),
        }
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if !self.header_read {
            self.read_stream_header()?;
        }
        let mut filled = 0;
        loop {
            // Deliver bytes already decoded into the window.
            while self.pending > 0 && filled < buf.len() {
                buf[filled] = self.window.peek_back(self.pending);
                self.pending -= 1;
                self.processed += 1;
                filled += 1;
            }
            if filled == buf.len() {
                return Ok(filled);
            }

            if self.block.is_none() {
                if filled > 0 {
                    // Hand back what we have before touching the next
                    // block header.
                    return Ok(filled);
                }
                self.block = Some(self.read_block_header()?);
            }
            let mut block = match self.block.take() {
                Some(block) => block,
                None => return Ok(filled),
            };
            let mut block_done = false;
            match &mut block {
                Block::Uncompressed { remaining, odd } => {
                    let take =
                        (*remaining as usize).min(buf.len() - filled);
                    let dest = &mut buf[filled..filled + take];
                    self.stream.read_aligned_bytes(dest)?;
                    for &byte in dest.iter() {
                        self.window.push(byte);
                    }
                    *remaining -= take as u32;
                    self.processed += take as u64;
                    filled += take;
                    if *remaining == 0 {
                        if *odd {
                            // An odd-length literal region is padded back to
                            // a 16-bit boundary; the pad may be missing when
                            // the block ends the stream.
                            let mut pad = [0u8; 1];
                            match self.stream.read_aligned_bytes(&mut pad) {
                                Ok(()) | Err(Error::UnexpectedEof) => {}
                                Err(err) => return Err(err),
                            }
                        }
                        block_done = true;
                    }
                }
                Block::Compressed { main, length, aligned, remaining } => {
                    if *remaining == 0 {
                        block_done = true;
                    } else {
                        if self.reset_interval > 0
                            && self.processed != 0
                            && self.processed % self.reset_interval == 0
                        {
                            self.stream.align();
                        }
                        let produced = decode_element(
                            &mut self.stream,
                            &mut self.window,
                            &mut self.registers,
                            main,
                            length,
                            aligned.as_ref(),
                        )?;
                        // An element never straddles a block boundary in a
                        // well-formed stream; any excess is dropped with
                        // the block.
                        let take = produced.min(*remaining as usize);
                        self.pending = take;
                        *remaining -= take as u32;
                    }
                }
            }
            if !block_done {
                self.block = Some(block);
            }
        }
    }
}

impl<R: Read> Read for LzxReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}

/// Decodes one element (a literal or a match) into the window and returns
/// the number of bytes it produced.
fn decode_element<R: Read>(
    stream: &mut BitStream<R>,
    window: &mut SlidingWindow,
    registers: &mut Registers,
    main: &Tree,
    length: &Tree,
    aligned: Option<&Tree>,
) -> Result<usize> {
    let main_element = main.decode(stream)? as usize;
    if main_element < NUM_CHARS {
        window.push(main_element as u8);
        return Ok(1);
    }
    let element = main_element - NUM_CHARS;

    let mut match_length = element & NUM_PRIMARY_LENGTHS;
    if match_length == NUM_PRIMARY_LENGTHS {
        match_length += length.decode(stream)? as usize;
    }
    match_length += MIN_MATCH;

    let position_slot = element >> 3;
    let match_offset = match position_slot {
        0 => registers.r0,
        1 => {
            std::mem::swap(&mut registers.r0, &mut registers.r1);
            registers.r0
        }
        2 => {
            std::mem::swap(&mut registers.r0, &mut registers.r2);
            registers.r0
        }
        slot => {
            let extra = extra_bits(slot);
            let aligned = aligned.filter(|tree| !tree.is_empty());
            let bits = if extra >= 3 && aligned.is_some() {
                let verbatim = stream.read(extra - 3)?;
                let low = aligned.unwrap().decode(stream)?;
                verbatim << 3 | u32::from(low)
            } else if extra > 0 {
                stream.read(extra)?
            } else {
                0
            };
            let offset = POSITION_BASE[slot] + bits - 2;
            registers.push(offset);
            offset
        }
    };

    let match_offset = match_offset as usize;
    if match_offset == 0 || match_offset > window.capacity() {
        return Err(Error::invalid_block(format!(
            "match offset {match_offset} outside the window"
        )));
    }
    for _ in 0..match_length {
        let byte = window.peek_back(match_offset);
        window.push(byte);
    }
    Ok(match_length)
}
