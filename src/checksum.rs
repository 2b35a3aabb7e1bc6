/// The cabinet data-block checksum: 32-bit XOR over little-endian 4-byte
/// groups, with a 1-3 byte tail packed MSB-first.
///
/// Writers feed arbitrary-length chunks; a partial group is buffered until
/// either more data arrives or `flush` ends the current grouping phase.
/// Block verification folds the payload and the header fields in separate
/// phases with a `flush` between them, so `flush` must be idempotent.
#[derive(Debug)]
pub(crate) struct Checksum {
    value: u32,
    pending: [u8; 4],
    pending_len: usize,
}

impl Checksum {
    pub(crate) fn new() -> Checksum {
        Checksum { value: 0, pending: [0; 4], pending_len: 0 }
    }

    pub(crate) fn update(&mut self, mut buf: &[u8]) {
        if self.pending_len > 0 {
            let needed = 4 - self.pending_len;
            if buf.len() < needed {
                self.pending[self.pending_len..self.pending_len + buf.len()]
                    .copy_from_slice(buf);
                self.pending_len += buf.len();
                return;
            }
            self.pending[self.pending_len..].copy_from_slice(&buf[..needed]);
            buf = &buf[needed..];
            self.value ^= u32::from_le_bytes(self.pending);
            self.pending_len = 0;
        }
        let mut chunks = buf.chunks_exact(4);
        for group in &mut chunks {
            self.value ^= u32::from_le_bytes(group.try_into().unwrap());
        }
        let tail = chunks.remainder();
        self.pending[..tail.len()].copy_from_slice(tail);
        self.pending_len = tail.len();
    }

    /// Folds any buffered tail bytes, MSB-first.  A flush with nothing
    /// buffered is a no-op.
    pub(crate) fn flush(&mut self) {
        if self.pending_len == 0 {
            return;
        }
        let mut tail: u32 = 0;
        for &byte in &self.pending[..self.pending_len] {
            tail = (tail << 8) | u32::from(byte);
        }
        self.value ^= tail;
        self.pending_len = 0;
    }

    pub(crate) fn value(&self) -> u32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::Checksum;

    /// The definition, without incremental buffering: XOR of little-endian
    /// 4-byte groups plus an MSB-first fold of the tail.
    fn reference_checksum(data: &[u8]) -> u32 {
        let mut value = 0u32;
        let mut chunks = data.chunks_exact(4);
        for group in &mut chunks {
            value ^= u32::from_le_bytes(group.try_into().unwrap());
        }
        let mut tail = 0u32;
        for &byte in chunks.remainder() {
            tail = (tail << 8) | u32::from(byte);
        }
        value ^ tail
    }

    #[test]
    fn empty_checksum() {
        let mut checksum = Checksum::new();
        checksum.flush();
        assert_eq!(checksum.value(), 0);
    }

    #[test]
    fn single_write_with_tail() {
        let mut checksum = Checksum::new();
        checksum.update(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07]);
        checksum.flush();
        assert_eq!(checksum.value(), 67503110);
    }

    #[test]
    fn flush_splits_grouping_phases() {
        let mut checksum = Checksum::new();
        checksum.update(&[0x01, 0x02, 0x03]);
        checksum.update(&[0x04, 0x05]);
        checksum.flush();
        checksum.update(&[0x06, 0x07]);
        checksum.flush();
        assert_eq!(checksum.value(), 67306499);
    }

    #[test]
    fn flush_is_idempotent() {
        let mut checksum = Checksum::new();
        checksum.update(&[0x01, 0x02, 0x03, 0x04, 0x05]);
        checksum.flush();
        let value = checksum.value();
        checksum.flush();
        assert_eq!(checksum.value(), value);
    }

    proptest! {
        #[test]
        fn chunking_never_changes_the_value(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            cuts in proptest::collection::vec(any::<prop::sample::Index>(), 0..8),
        ) {
            let mut cuts: Vec<usize> =
                cuts.iter().map(|cut| cut.index(data.len() + 1)).collect();
            cuts.sort_unstable();

            let mut chunked = Checksum::new();
            let mut start = 0;
            for cut in cuts {
                chunked.update(&data[start..cut.max(start)]);
                start = cut.max(start);
            }
            chunked.update(&data[start..]);
            chunked.flush();

            prop_assert_eq!(chunked.value(), reference_checksum(&data));
        }
    }

    #[test]
    fn checksum_from_cab_spec_example() {
        // Payload plus header tail of the example block in the CAB
        // documentation.
        let mut checksum = Checksum::new();
        checksum.update(
            b"#include <stdio.h>\r\n\r\n\
              void main(void)\r\n{\r\n    \
              printf(\"Hello, world!\\n\");\r\n}\r\n\
              #include <stdio.h>\r\n\r\n\
              void main(void)\r\n{\r\n    \
              printf(\"Welcome!\\n\");\r\n}\r\n\r\n",
        );
        checksum.flush();
        checksum.update(&0x97u16.to_le_bytes());
        checksum.update(&0x97u16.to_le_bytes());
        checksum.flush();
        assert_eq!(checksum.value(), 0x30a65abd);
    }
}
