use crate::error::{Error, Result};
use crate::lzx;

const CTYPE_NONE: u16 = 0;
const CTYPE_MSZIP: u16 = 1;
const CTYPE_QUANTUM: u16 = 2;
const CTYPE_LZX: u16 = 3;

const QUANTUM_LEVEL_MIN: u16 = 1;
const QUANTUM_LEVEL_MAX: u16 = 7;
const QUANTUM_MEMORY_MIN: u16 = 10;
const QUANTUM_MEMORY_MAX: u16 = 21;

/// A scheme for compressing data within the cabinet.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum CompressionType {
    /// No compression.
    None,
    /// MSZIP compression.  MSZIP is described further in
    /// [MS-MCI](https://msdn.microsoft.com/en-us/library/cc483131.aspx).
    MsZip,
    /// Quantum compression with the given level and memory.
    Quantum(u16, u16),
    /// LZX compression with the given window size exponent (the window is
    /// `1 << exponent` bytes).  The LZX compression scheme is described
    /// further in
    /// [MS-PATCH](https://msdn.microsoft.com/en-us/library/cc483133.aspx).
    Lzx(u8),
}

impl CompressionType {
    pub(crate) fn from_bitfield(bits: u16) -> Result<CompressionType> {
        let ctype = bits & 0x000f;
        if ctype == CTYPE_NONE {
            Ok(CompressionType::None)
        } else if ctype == CTYPE_MSZIP {
            Ok(CompressionType::MsZip)
        } else if ctype == CTYPE_QUANTUM {
            let level = (bits & 0x00f0) >> 4;
            if !(QUANTUM_LEVEL_MIN..=QUANTUM_LEVEL_MAX).contains(&level) {
                return Err(Error::UnknownCompression(bits));
            }
            let memory = (bits & 0x1f00) >> 8;
            if !(QUANTUM_MEMORY_MIN..=QUANTUM_MEMORY_MAX).contains(&memory) {
                return Err(Error::UnknownCompression(bits));
            }
            Ok(CompressionType::Quantum(level, memory))
        } else if ctype == CTYPE_LZX {
            let window = ((bits >> 8) & 0x1f) as u8;
            if !(lzx::MIN_WINDOW_EXPONENT..=lzx::MAX_WINDOW_EXPONENT)
                .contains(&window)
            {
                return Err(Error::UnknownCompression(bits));
            }
            Ok(CompressionType::Lzx(window))
        } else {
            Err(Error::UnknownCompression(bits))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CompressionType;
    use crate::error::Error;

    #[test]
    fn compression_type_from_bitfield() {
        assert_eq!(
            CompressionType::from_bitfield(0x0).unwrap(),
            CompressionType::None
        );
        assert_eq!(
            CompressionType::from_bitfield(0x1).unwrap(),
            CompressionType::MsZip
        );
        assert_eq!(
            CompressionType::from_bitfield(0x1472).unwrap(),
            CompressionType::Quantum(7, 20)
        );
        assert_eq!(
            CompressionType::from_bitfield(0x1503).unwrap(),
            CompressionType::Lzx(21)
        );
        assert_eq!(
            CompressionType::from_bitfield(0x1303).unwrap(),
            CompressionType::Lzx(19)
        );
    }

    #[test]
    fn bad_bitfields_are_rejected() {
        for bits in [0x0004u16, 0x000f, 0x1603, 0x0e03, 0x0072, 0x2672] {
            match CompressionType::from_bitfield(bits) {
                Err(Error::UnknownCompression(got)) => assert_eq!(got, bits),
                other => panic!("expected rejection of {bits:#06x}: {other:?}"),
            }
        }
    }
}
