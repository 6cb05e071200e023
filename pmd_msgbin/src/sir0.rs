use byteorder::{ReadBytesExt, WriteBytesExt, LE};
use std::io::Error as IOError;
use std::io::{Cursor, Write};
use thiserror::Error;

/// List all possible error that [`Sir0`] can return
#[derive(Debug, Error)]
pub enum Sir0Error {
    #[error("An error happened while performing an IO operation")]
    IOError(#[from] IOError),
    #[error("The magic of the Sir0 file is not reconized: found {0:?}")]
    InvalidMagic([u8; 4]),
    #[error("the file is too short to contain a sir0 header: it is {0} bytes long, while the header need 16 bytes")]
    TruncatedHeader(usize),
    #[error("the sir0 file indicate that the pointer list of the file is at offset {1}, but that the content header is at {0}, at or after the pointer list")]
    PointerListBeforeHeader(u32, u32),
    #[error("the offset of the pointer list ({0}) is past the end of file ({1})")]
    PointerListPastFileEnd(u64, u64),
    #[error("a pointer offset is still being accumulated at the end of the file (the continuation bit of the last byte is set)")]
    UnterminatedPointerOffset,
    #[error("the absolute position represented by a sir0 offset overflow the maximal capacity of an unsigned integer of 64 bit (absolute position: {0}, delta to add: {1})")]
    AbsolutePointerOverflow(u64, u64),
    #[error("the pointer offsets of the file aren't strictly increasing: a delta of zero was found after the absolute offset {0}")]
    UnsortedPointerOffset(u64),
    #[error("the pointer offset {0} doesn't address four bytes before the pointer list at {1}")]
    PointerOffsetOutOfBounds(u64, u64),
}

/// A Sir0 file, used in pokémon mystery dungeon on 3ds and DS (only tested with the 3ds version)
///
/// The whole file is kept in memory as a single buffer, so the content can
/// later be patched in place without rebuilding the envelope. The pointer
/// list at the end of the file is decoded for validation, but never
/// regenerated by the in place save path.
#[derive(Debug)]
pub struct Sir0 {
    bytes: Vec<u8>,
    content_header_offset: u32,
    pointer_list_offset: u32,
    content_header_len: usize,
    header_padding: usize,
    pointer_offsets: Vec<u64>,
}

impl Sir0 {
    /// Create a new Sir0 from the full file image. The pointer offsets of the
    /// file are required to be strictly increasing.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, Sir0Error> {
        Self::load(bytes, false)
    }

    /// Same as [`Sir0::from_bytes`], but tolerate duplicate pointer offsets
    /// (a delta of zero in the pointer list). Some badly generated file have
    /// them.
    pub fn from_bytes_lenient(bytes: Vec<u8>) -> Result<Self, Sir0Error> {
        Self::load(bytes, true)
    }

    fn load(bytes: Vec<u8>, tolerate_unsorted: bool) -> Result<Self, Sir0Error> {
        if bytes.len() < 16 {
            return Err(Sir0Error::TruncatedHeader(bytes.len()));
        }
        let mut magic = [0; 4];
        magic.copy_from_slice(&bytes[0..4]);
        if &magic != b"SIR0" {
            return Err(Sir0Error::InvalidMagic(magic));
        }

        let mut cursor = Cursor::new(&bytes);
        cursor.set_position(4);
        let content_header_offset = cursor.read_u32::<LE>()?;
        let pointer_list_offset = cursor.read_u32::<LE>()?;

        if pointer_list_offset <= content_header_offset {
            return Err(Sir0Error::PointerListBeforeHeader(
                content_header_offset,
                pointer_list_offset,
            ));
        }
        if pointer_list_offset as u64 > bytes.len() as u64 {
            return Err(Sir0Error::PointerListPastFileEnd(
                pointer_list_offset as u64,
                bytes.len() as u64,
            ));
        }

        let header = &bytes[content_header_offset as usize..pointer_list_offset as usize];
        let mut content_header_len = header.len();
        while content_header_len > 0 && header[content_header_len - 1] == 0 {
            content_header_len -= 1;
        }
        let header_padding = header.len() - content_header_len;

        let pointer_offsets = decode_sir0_pointer_offsets(
            &bytes[pointer_list_offset as usize..],
            tolerate_unsorted,
        )?;
        for &offset in &pointer_offsets {
            let end = offset
                .checked_add(4)
                .map_or_else(|| Err(Sir0Error::AbsolutePointerOverflow(offset, 4)), Ok)?;
            if end > pointer_list_offset as u64 {
                return Err(Sir0Error::PointerOffsetOutOfBounds(
                    offset,
                    pointer_list_offset as u64,
                ));
            }
        }

        Ok(Self {
            bytes,
            content_header_offset,
            pointer_list_offset,
            content_header_len,
            header_padding,
            pointer_offsets,
        })
    }

    /// return the full file image
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut Vec<u8> {
        &mut self.bytes
    }

    /// consume this Sir0 and return the full file image
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// return the content header of the file, with the trailing run of zero
    /// padding trimmed. Its meaning depend on the file contained in the Sir0.
    pub fn content_header(&self) -> &[u8] {
        let start = self.content_header_offset as usize;
        &self.bytes[start..start + self.content_header_len]
    }

    /// return the absolute offset of the content header
    pub fn content_header_offset(&self) -> u32 {
        self.content_header_offset
    }

    /// return the absolute offset of the pointer list
    pub fn pointer_list_offset(&self) -> u32 {
        self.pointer_list_offset
    }

    /// return the number of zero padding bytes between the end of the content
    /// header and the pointer list
    pub fn header_padding(&self) -> usize {
        self.header_padding
    }

    /// return the decoded pointer offsets. Each one is the absolute position
    /// of a 32 bit pointer somewhere in the file.
    pub fn pointer_offsets(&self) -> &[u64] {
        &self.pointer_offsets
    }

    /// return the length of the file without the trailing pointer list.
    /// This is only a diagnostic value, the in place save path keep the file
    /// length untouched.
    pub fn logical_len(&self) -> usize {
        self.pointer_list_offset as usize
    }
}

/// Decode the pointer offset stream that end a Sir0 file.
///
/// Each entry is a delta to the previous absolute offset (the first one is
/// relative to 0), stored as 7 bit groups with the most significant group
/// first. The high bit of a byte mark a continuation, and a lone zero byte
/// terminate the stream.
pub fn decode_sir0_pointer_offsets(
    stream: &[u8],
    tolerate_unsorted: bool,
) -> Result<Vec<u64>, Sir0Error> {
    let mut absolute_pointers = Vec::new();
    let mut is_constructing = false;
    let mut constructed_pointer: u64 = 0;
    let mut absolute_position: u64 = 0;
    for &current in stream {
        if current & 0x80 != 0 {
            is_constructing = true;
            constructed_pointer =
                constructed_pointer.overflowing_shl(7).0 | ((current & 0x7F) as u64);
            continue;
        }
        if current == 0 && !is_constructing {
            return Ok(absolute_pointers);
        }
        constructed_pointer = constructed_pointer.overflowing_shl(7).0 | ((current & 0x7F) as u64);
        if constructed_pointer == 0 && !tolerate_unsorted {
            return Err(Sir0Error::UnsortedPointerOffset(absolute_position));
        }
        absolute_position = absolute_position
            .checked_add(constructed_pointer)
            .map_or_else(
                || {
                    Err(Sir0Error::AbsolutePointerOverflow(
                        absolute_position,
                        constructed_pointer,
                    ))
                },
                Ok,
            )?;
        absolute_pointers.push(absolute_position);
        is_constructing = false;
        constructed_pointer = 0;
    }
    if is_constructing {
        return Err(Sir0Error::UnterminatedPointerOffset);
    }
    Ok(absolute_pointers)
}

/// write the sir0 header at the current position of the file. It should be
/// written at the beggining of the file, but require to know the content
/// header and pointer list offset.
///
/// It have a constant size of 16 bytes (the last four are reserved and left
/// at zero), so you can reserve 16 bytes at the beggining of the file, write
/// the content, then seek back and call this function.
pub fn write_sir0_header(
    file: &mut impl Write,
    header_offset: u32,
    offset_offset: u32,
) -> Result<(), IOError> {
    file.write_all(&[b'S', b'I', b'R', b'0'])?;
    file.write_u32::<LE>(header_offset)?;
    file.write_u32::<LE>(offset_offset)?;
    file.write_all(&[0; 4])?;
    Ok(())
}

/// An error that occured while writing a sir0 footer
#[derive(Error, Debug)]
pub enum Sir0WriteError {
    #[error("an error occured while writing the file")]
    IOError(#[from] IOError),
    #[error("the pointer offsets to write aren't strictly increasing: {0} come after {1}")]
    NotSorted(u64, u64),
}

/// Write a sir0 footer, pointing to the various pointer of the file, and
/// terminate it with a single zero byte.
///
/// The offsets are absolute positions since the start of the file, and need
/// to be strictly increasing. For a normal Sir0 file, the first 2 element
/// should be [4, 8].
pub fn write_sir0_footer<T>(file: &mut T, list: &[u64]) -> Result<(), Sir0WriteError>
where
    T: Write,
{
    let mut latest_written_pointer: u64 = 0;
    for &original_to_write in list {
        let mut remaining_to_write = original_to_write
            .checked_sub(latest_written_pointer)
            .map_or_else(
                || {
                    Err(Sir0WriteError::NotSorted(
                        original_to_write,
                        latest_written_pointer,
                    ))
                },
                Ok,
            )?;
        // a delta of zero is reserved for the stream terminator
        if remaining_to_write == 0 {
            return Err(Sir0WriteError::NotSorted(
                original_to_write,
                latest_written_pointer,
            ));
        }
        latest_written_pointer = original_to_write;
        let mut reversed_to_write = Vec::new();
        while remaining_to_write >= 128 {
            reversed_to_write.push((remaining_to_write % 128) as u8);
            remaining_to_write >>= 7;
        }
        reversed_to_write.push(remaining_to_write as u8);
        for (counter, value_to_write) in reversed_to_write.iter().cloned().enumerate().rev() {
            if counter == 0 {
                file.write_all(&[value_to_write])?;
            } else {
                file.write_all(&[value_to_write | 0b1000_0000])?;
            }
        }
    }
    file.write_all(&[0])?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn encode(list: &[u64]) -> Vec<u8> {
        let mut buffer = Vec::new();
        write_sir0_footer(&mut buffer, list).unwrap();
        buffer
    }

    #[test]
    fn test_footer_round_trip() {
        for list in [
            vec![],
            vec![4, 8],
            vec![4, 8, 0x58, 0x64, 0x74],
            vec![1, 2, 3, 130, 0x4000, 0x1F_FFFF, 0x1234_5678, 0x1_0000_0000],
        ]
        .iter()
        {
            let encoded = encode(list);
            let decoded = decode_sir0_pointer_offsets(&encoded, false).unwrap();
            assert_eq!(&decoded, list);
        }
    }

    #[test]
    fn test_varint_carry() {
        // a single delta of 128 need two groups plus the terminator
        assert_eq!(encode(&[0x80]), vec![0x81, 0x00, 0x00]);
        assert_eq!(
            decode_sir0_pointer_offsets(&[0x81, 0x00, 0x00], false).unwrap(),
            vec![0x80]
        );
    }

    #[test]
    fn test_empty_footer() {
        assert_eq!(encode(&[]), vec![0x00]);
        assert_eq!(
            decode_sir0_pointer_offsets(&[0x00], false).unwrap(),
            Vec::<u64>::new()
        );
    }

    #[test]
    fn test_footer_reject_unsorted() {
        let mut buffer = Vec::new();
        match write_sir0_footer(&mut buffer, &[8, 8]) {
            Err(Sir0WriteError::NotSorted(8, 8)) => (),
            other => panic!("{:?}", other),
        }
        match write_sir0_footer(&mut buffer, &[8, 4]) {
            Err(Sir0WriteError::NotSorted(4, 8)) => (),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_decode_unterminated_group() {
        match decode_sir0_pointer_offsets(&[0x81], false) {
            Err(Sir0Error::UnterminatedPointerOffset) => (),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_decode_zero_delta() {
        // a delta of 4, then a zero delta hidden behind a continuation bit
        let stream = [0x04, 0x80, 0x00, 0x00];
        match decode_sir0_pointer_offsets(&stream, false) {
            Err(Sir0Error::UnsortedPointerOffset(4)) => (),
            other => panic!("{:?}", other),
        }
        assert_eq!(
            decode_sir0_pointer_offsets(&stream, true).unwrap(),
            vec![4, 4]
        );
    }

    #[test]
    fn test_sir0_envelope_errors() {
        match Sir0::from_bytes(b"NOPE".to_vec()) {
            Err(Sir0Error::TruncatedHeader(4)) => (),
            other => panic!("{:?}", other),
        }
        let mut bad_magic = vec![0u8; 32];
        bad_magic[0..4].copy_from_slice(b"SIR1");
        match Sir0::from_bytes(bad_magic) {
            Err(Sir0Error::InvalidMagic(_)) => (),
            other => panic!("{:?}", other),
        }

        // pointer list before the content header
        let mut file = vec![0u8; 32];
        file[0..4].copy_from_slice(b"SIR0");
        file[4..8].copy_from_slice(&24u32.to_le_bytes());
        file[8..12].copy_from_slice(&16u32.to_le_bytes());
        match Sir0::from_bytes(file) {
            Err(Sir0Error::PointerListBeforeHeader(24, 16)) => (),
            other => panic!("{:?}", other),
        }

        // pointer list past the end of the file
        let mut file = vec![0u8; 32];
        file[0..4].copy_from_slice(b"SIR0");
        file[4..8].copy_from_slice(&16u32.to_le_bytes());
        file[8..12].copy_from_slice(&64u32.to_le_bytes());
        match Sir0::from_bytes(file) {
            Err(Sir0Error::PointerListPastFileEnd(64, 32)) => (),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_sir0_load() {
        // 16 byte header, 8 byte content header padded to 16, then the footer
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&32u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&2u32.to_le_bytes());
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&[0; 8]);
        file.extend_from_slice(&[0x04, 0x04, 0x0C, 0x00]);

        let sir0 = Sir0::from_bytes(file).unwrap();
        assert_eq!(sir0.content_header_offset(), 16);
        assert_eq!(sir0.pointer_list_offset(), 32);
        assert_eq!(sir0.pointer_offsets(), &[4, 8, 20]);
        // the content header is trimmed up to the last non zero byte
        assert_eq!(sir0.content_header(), &[2, 0, 0, 0, 16]);
        assert_eq!(sir0.header_padding(), 11);
        assert_eq!(sir0.logical_len(), 32);
    }

    #[test]
    fn test_sir0_lenient_duplicate_offset() {
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&32u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&2u32.to_le_bytes());
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&[0; 8]);
        // the offset 8 is listed twice, as a zero delta hidden behind a
        // continuation bit
        file.extend_from_slice(&[0x04, 0x04, 0x80, 0x00, 0x0C, 0x00]);

        match Sir0::from_bytes(file.clone()) {
            Err(Sir0Error::UnsortedPointerOffset(8)) => (),
            other => panic!("{:?}", other),
        }
        let sir0 = Sir0::from_bytes_lenient(file).unwrap();
        assert_eq!(sir0.pointer_offsets(), &[4, 8, 8, 20]);
    }

    #[test]
    fn test_sir0_reject_out_of_bounds_pointer_offset() {
        // the single pointer offset land 2 bytes before the pointer list
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&16u32.to_le_bytes());
        file.extend_from_slice(&24u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&[1, 0, 0, 0, 0, 0, 0, 0]);
        file.extend_from_slice(&[0x16, 0x00]);
        match Sir0::from_bytes(file) {
            Err(Sir0Error::PointerOffsetOutOfBounds(0x16, 24)) => (),
            other => panic!("{:?}", other),
        }
    }
}
