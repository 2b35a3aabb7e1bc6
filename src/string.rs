use std::io::Read;

use byteorder::ReadBytesExt;

use crate::consts;
use crate::error::{Error, Result};

/// Reads a NUL-terminated byte string, without the terminator.  Cabinet
/// names are UTF-8 only when the entry's `NameUtf` attribute says so, and
/// OEM-code-page bytes otherwise, so the raw bytes are preserved and any
/// decoding is left to the caller.
pub(crate) fn read_null_terminated_bytes<R: Read>(
    reader: &mut R,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::<u8>::with_capacity(consts::MAX_STRING_SIZE);
    loop {
        let byte = match reader.read_u8() {
            Ok(byte) => byte,
            Err(ref err) if err.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Err(Error::UnexpectedEof);
            }
            Err(err) => return Err(Error::Io(err)),
        };
        if byte == 0 {
            break;
        } else if bytes.len() == consts::MAX_STRING_SIZE {
            return Err(Error::invalid_block(format!(
                "string longer than maximum of {} bytes",
                consts::MAX_STRING_SIZE
            )));
        }
        bytes.push(byte);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::read_null_terminated_bytes;
    use crate::error::Error;

    #[test]
    fn reads_up_to_terminator() {
        let mut input: &[u8] = b"hi.txt\0trailing";
        let bytes = read_null_terminated_bytes(&mut input).unwrap();
        assert_eq!(bytes, b"hi.txt");
        assert_eq!(input, b"trailing");
    }

    #[test]
    fn missing_terminator_is_unexpected_eof() {
        let mut input: &[u8] = b"no-terminator";
        match read_null_terminated_bytes(&mut input) {
            Err(Error::UnexpectedEof) => {}
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
