use std::io::Read;

use super::LzxReader;
use crate::error::{Error, Result};

/// Undoes the LZX encoder's x86 call translation: every `E8` opcode whose
/// four displacement bytes decode to an absolute target inside the
/// translated region is rewritten back to a relative displacement.
///
/// The filter sits between the block decoder and the caller.  While the
/// stream has no translation size, or no translation-capable block has been
/// seen yet, it passes data through untouched (the output cursor still
/// advances).  A displacement that runs past the end of a delivery is
/// completed by reading ahead; whatever does not fit in the caller's buffer
/// is stashed and delivered first on the next call.
#[derive(Debug)]
pub(crate) struct IntelReader<R> {
    inner: LzxReader<R>,
    stash: Vec<u8>,
    /// Output bytes delivered so far.
    position: u64,
}

impl<R: Read> IntelReader<R> {
    pub(crate) fn new(inner: LzxReader<R>) -> IntelReader<R> {
        IntelReader { inner, stash: Vec::with_capacity(4), position: 0 }
    }

    pub(crate) fn fill(&mut self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut delivered = 0;
        if !self.stash.is_empty() {
            let take = self.stash.len().min(buf.len());
            buf[..take].copy_from_slice(&self.stash[..take]);
            self.stash.drain(..take);
            self.position += take as u64;
            delivered = take;
            if delivered == buf.len() {
                return Ok(delivered);
            }
        }

        if !self.inner.intel_active() {
            let count = self.inner.fill(&mut buf[delivered..])?;
            self.position += count as u64;
            return Ok(delivered + count);
        }

        let start = self.position;
        let count = self.inner.fill(&mut buf[delivered..])?;
        let region = &mut buf[delivered..delivered + count];
        let file_size = i64::from(self.inner.intel_file_size());
        let mut index = 0;
        while index < count {
            if region[index] != 0xe8 {
                index += 1;
                continue;
            }
            let mut call_bytes = [0u8; 4];
            let available = (count - index - 1).min(4);
            call_bytes[..available]
                .copy_from_slice(&region[index + 1..index + 1 + available]);
            if available < 4 {
                let got =
                    read_full(&mut self.inner, &mut call_bytes[available..])?;
                if got < 4 - available {
                    // The stream ended inside the displacement: the call is
                    // left untranslated and the read-ahead bytes are carried
                    // to the next delivery as-is.
                    self.stash.extend_from_slice(
                        &call_bytes[available..available + got],
                    );
                    index += 1;
                    continue;
                }
            }
            let absolute = i64::from(i32::from_le_bytes(call_bytes));
            let cursor = (start + index as u64) as i64;
            if absolute >= -cursor && absolute < file_size {
                let relative = if absolute >= 0 {
                    absolute - cursor
                } else {
                    absolute + file_size
                };
                call_bytes = (relative as i32).to_le_bytes();
            }
            region[index + 1..index + 1 + available]
                .copy_from_slice(&call_bytes[..available]);
            self.stash.extend_from_slice(&call_bytes[available..]);
            // A displacement byte is never itself a trigger.
            index += 5;
        }
        self.position += count as u64;
        Ok(delivered + count)
    }
}

impl<R: Read> Read for IntelReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        Ok(self.fill(buf)?)
    }
}

fn read_full<R: Read>(
    inner: &mut LzxReader<R>,
    buf: &mut [u8],
) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        // Asking past the final block surfaces as an EOF from the block
        // layer; for the read-ahead that simply means the displacement
        // cannot be completed.
        let count = match inner.fill(&mut buf[filled..]) {
            Ok(count) => count,
            Err(Error::UnexpectedEof) => break,
            Err(err) => return Err(err),
        };
        if count == 0 {
            break;
        }
        filled += count;
    }
    Ok(filled)
}
