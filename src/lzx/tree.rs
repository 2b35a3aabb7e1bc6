use std::io::Read;

use super::bitstream::BitStream;
use crate::error::{Error, Result};

/// Number of symbols in the pre-tree that encodes code-length deltas.
const PRE_TREE_SIZE: usize = 20;
/// Width of the raw code lengths the pre-tree itself is read with.
const PRE_TREE_LENGTH_BITS: u32 = 4;

/// A canonical Huffman decoder backed by a flat lookup table of
/// `2^max_len` entries, so one `peek` resolves any symbol.
#[derive(Debug)]
pub(crate) struct Tree {
    lengths: Vec<u8>,
    max_len: u8,
    table: Vec<u16>,
}

impl Tree {
    /// Builds the lookup table from a code-length vector.  An all-zero
    /// vector builds an empty tree: LZX emits those for trees a block never
    /// uses, so construction accepts them and only decoding rejects them.
    pub(crate) fn from_lengths(lengths: Vec<u8>) -> Result<Tree> {
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if max_len == 0 {
            return Ok(Tree { lengths, max_len, table: Vec::new() });
        }

        // Kraft equality: the lengths must fill the code space exactly.
        let mut used: u32 = 0;
        for &length in &lengths {
            if length > 0 {
                used += 1 << (max_len - length);
            }
        }
        if used != 1 << max_len {
            return Err(Error::InvalidTree("code lengths violate kraft equality"));
        }

        let mut table = vec![0u16; 1usize << max_len];
        let mut position = 0;
        for bit in 1..=max_len {
            let amount = 1usize << (max_len - bit);
            for (symbol, &length) in lengths.iter().enumerate() {
                if length != bit {
                    continue;
                }
                if position + amount > table.len() {
                    return Err(Error::InvalidTree("lookup table overrun"));
                }
                table[position..position + amount].fill(symbol as u16);
                position += amount;
            }
        }
        if position != table.len() {
            return Err(Error::InvalidTree("lookup table underfilled"));
        }

        Ok(Tree { lengths, max_len, table })
    }

    /// Reads `count` raw code lengths of `width` bits each and builds the
    /// tree.  Used for pre-trees and the aligned-offset tree.
    pub(crate) fn read_direct<R: Read>(
        stream: &mut BitStream<R>,
        width: u32,
        count: usize,
    ) -> Result<Tree> {
        let mut lengths = vec![0u8; count];
        for length in lengths.iter_mut() {
            *length = stream.read(width)? as u8;
        }
        Tree::from_lengths(lengths)
    }

    /// True for the degenerate all-zero tree.
    pub(crate) fn is_empty(&self) -> bool {
        self.max_len == 0
    }

    pub(crate) fn decode<R: Read>(
        &self,
        stream: &mut BitStream<R>,
    ) -> Result<u16> {
        if self.max_len == 0 {
            return Err(Error::InvalidTree("decoding with an empty tree"));
        }
        let index = stream.peek(u32::from(self.max_len))? as usize;
        let symbol = self.table[index];
        stream.read(u32::from(self.lengths[symbol as usize]))?;
        Ok(symbol)
    }

    /// Rewrites one interval of a code-length vector in place, driven by a
    /// freshly-read pre-tree.  Codes 0..=16 are deltas against the vector's
    /// previous contents (how the lengths carry over between blocks); 17 and
    /// 18 are zero runs; 19 repeats a delta a short run of times.  Runs are
    /// clamped to the interval.
    pub(crate) fn update_lengths<R: Read>(
        stream: &mut BitStream<R>,
        lengths: &mut [u8],
    ) -> Result<()> {
        let pre_tree =
            Tree::read_direct(stream, PRE_TREE_LENGTH_BITS, PRE_TREE_SIZE)?;
        let mut index = 0;
        while index < lengths.len() {
            let code = pre_tree.decode(stream)?;
            match code {
                17 | 18 => {
                    let run = if code == 17 {
                        stream.read(4)? as usize + 4
                    } else {
                        stream.read(5)? as usize + 20
                    };
                    let run = run.min(lengths.len() - index);
                    lengths[index..index + run].fill(0);
                    index += run;
                }
                19 => {
                    let run = stream.read(1)? as usize + 4;
                    let run = run.min(lengths.len() - index);
                    let delta = pre_tree.decode(stream)?;
                    let length = u16::from(lengths[index])
                        .wrapping_add(17)
                        .wrapping_sub(delta)
                        % 17;
                    lengths[index..index + run].fill(length as u8);
                    index += run;
                }
                delta => {
                    lengths[index] =
                        ((u16::from(lengths[index]) + 17 - delta) % 17) as u8;
                    index += 1;
                }
            }
        }
        Ok(())
    }
}
