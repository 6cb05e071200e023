//! This crate allow you to read, edit and write back message*.bin files, used
//! on mystery dungeon games on nintendo 3DS to store the game text.
//!
//! A message*.bin file is a Sir0 container whose content header describe a
//! directory of UTF-16 strings, each associated with a 32 bit hash used as a
//! key by the game engine.
//!
//! The main entry point is [`MessageBin`]. Contrary to a full reencode, the
//! in place save path ([`MessageBin::save_in_place`]) rewrite each edited
//! string inside the byte range it was loaded from, so the pointer list and
//! every untouched byte of the file are preserved exactly.

use binread::{BinRead, BinReaderExt, NullWideString};
use binwrite::BinWrite;
use byteorder::{WriteBytesExt, LE};
use std::{
    collections::BTreeMap,
    convert::TryInto,
    io::{self, Cursor, Read, Seek, SeekFrom, Write},
    num::TryFromIntError,
};
use thiserror::Error;

pub mod sir0;
pub mod table;
pub mod translate;

pub use sir0::{Sir0, Sir0Error, Sir0WriteError};
pub use table::{ImportWarning, TableError};
pub use translate::{replace_japanese_runs, Cell, GlossaryTranslator, SubstituteError, Translator};

use sir0::{write_sir0_footer, write_sir0_header};

/// An error that may occur when reading a [`MessageBin`] file
#[derive(Error, Debug)]
pub enum MessageBinReadError {
    #[error("an input/output error occured")]
    IOError(#[from] io::Error),
    #[error("an error occured when reading the Sir0 part of the file")]
    Sir0Error(#[from] Sir0Error),
    #[error("a binread error occured")]
    BinReadError(#[from] binread::Error),
    #[error("the content header is too short to contain a string directory: it is {0} bytes long, while 8 bytes are needed")]
    HeaderTooShort(usize),
    #[error("the string directory (at offset {0}, {1} records of 12 bytes) doesn't fit in the file")]
    DirectoryOutOfBounds(u32, u32),
    #[error("the string at offset {0} has no null terminator before the end of the file")]
    UnterminatedString(u32),
}

/// An error that may occur when rebuilding a [`MessageBin`] file via
/// [`MessageBin::write`]
#[derive(Error, Debug)]
pub enum MessageBinWriteError {
    #[error("an input/output error occured")]
    IOError(#[from] io::Error),
    #[error("the target file is too big (more than 2^32 bytes) (int conversion failed)")]
    TooBigError(#[from] TryFromIntError),
    #[error("the target file is too big (more than 2^32 bytes) (overflow)")]
    Overflow,
    #[error("an error occured writing the sir0 footer")]
    Sir0WriteError(#[from] Sir0WriteError),
    #[error("the rebuilt image failed to parse back")]
    Reparse(#[source] Box<MessageBinReadError>),
}

#[derive(BinRead, Debug)]
#[br(little)]
struct MessageBinHeader {
    string_count: u32,
    string_info_offset: u32,
}

#[derive(BinRead, Debug, BinWrite)]
#[br(little)]
#[binwrite(little)]
struct StringInfo {
    pointer: u32,
    hash: u32,
    unknown: u32,
}

/// One string of a [`MessageBin`] file, pinned to the byte range it was
/// loaded from.
///
/// Everything but the text is frozen at load time. The text can be replaced
/// with [`MessageBinEntry::set_text`], and the next
/// [`MessageBin::save_in_place`] will rewrite it inside the original slot.
#[derive(Debug, Clone)]
pub struct MessageBinEntry {
    pointer: u32,
    hash: u32,
    unknown: u32,
    allocated_len: usize,
    original_index: usize,
    text: String,
    edited: bool,
}

impl MessageBinEntry {
    /// return the hash identifying this string (probably crc32 of its label)
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// return the unknown 32 bit value of the directory record. Its meaning
    /// is not documented, it is preserved verbatim.
    pub fn unknown(&self) -> u32 {
        self.unknown
    }

    /// return the absolute offset of the UTF-16 payload in the file
    pub fn pointer(&self) -> u32 {
        self.pointer
    }

    /// return the byte length of the slot this string occupy in the file,
    /// null terminator included
    pub fn allocated_len(&self) -> usize {
        self.allocated_len
    }

    /// return the rank of this entry when all entries are sorted by ascending
    /// pointer. The directory itself is surfaced in record order, so both
    /// orderings are available.
    pub fn original_index(&self) -> usize {
        self.original_index
    }

    /// return the text of this entry, as surfaced to an editor (leading and
    /// trailing ascii whitespace removed)
    pub fn text(&self) -> &str {
        &self.text
    }

    /// return the number of UTF-16 bytes the slot can hold, terminator
    /// excluded. A longer text will be truncated at save time.
    pub fn capacity(&self) -> usize {
        self.allocated_len - 2
    }

    /// Replace the text of this entry. The slot does not grow: if the UTF-16
    /// encoding of the new text exceed [`MessageBinEntry::capacity`], the
    /// next in place save will truncate it and report a [`PatchWarning`].
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.edited = true;
    }

    /// return true if the text was replaced since the last load or save
    pub fn is_edited(&self) -> bool {
        self.edited
    }
}

/// A non fatal event reported by [`MessageBin::save_in_place`]: the encoded
/// text of an entry did not fit in its slot and was truncated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchWarning {
    /// position of the entry in iteration order
    pub entry_index: usize,
    /// hash of the affected entry
    pub hash: u32,
    /// how many UTF-16 bytes were dropped
    pub lost_bytes: usize,
}

/// A message*.bin file held fully in memory, with its string directory
/// decoded.
///
/// Entries are surfaced in the order of the directory records. The
/// [`MessageBinEntry::original_index`] of each entry give its rank under the
/// pointer ordering instead.
#[derive(Debug)]
pub struct MessageBin {
    sir0: Sir0,
    header_extension: Vec<u8>,
    entries: Vec<MessageBinEntry>,
    hash_to_index: BTreeMap<u32, usize>,
}

impl MessageBin {
    /// Load a MessageBin file from the reader.
    pub fn load_file<T: Read>(file: &mut T) -> Result<Self, MessageBinReadError> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// Same as [`MessageBin::load_file`], but tolerate duplicate pointer
    /// offsets in the Sir0 pointer list.
    pub fn load_file_lenient<T: Read>(file: &mut T) -> Result<Self, MessageBinReadError> {
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;
        Self::from_bytes_lenient(bytes)
    }

    /// Load a MessageBin file from its full byte image.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, MessageBinReadError> {
        Self::load(Sir0::from_bytes(bytes)?)
    }

    /// Same as [`MessageBin::from_bytes`], but tolerate duplicate pointer
    /// offsets in the Sir0 pointer list. Some badly generated file have them.
    pub fn from_bytes_lenient(bytes: Vec<u8>) -> Result<Self, MessageBinReadError> {
        Self::load(Sir0::from_bytes_lenient(bytes)?)
    }

    fn load(sir0: Sir0) -> Result<Self, MessageBinReadError> {
        let header_region_len =
            (sir0.pointer_list_offset() - sir0.content_header_offset()) as usize;
        if header_region_len < 8 {
            return Err(MessageBinReadError::HeaderTooShort(header_region_len));
        }

        let mut cursor = Cursor::new(sir0.bytes());
        cursor.seek(SeekFrom::Start(sir0.content_header_offset() as u64))?;
        let header: MessageBinHeader = cursor.read_le()?;
        let header_extension = match sir0.content_header().get(8..) {
            Some(extension) => extension.to_vec(),
            None => Vec::new(),
        };

        let directory_end = (header.string_count as u64)
            .checked_mul(12)
            .and_then(|len| len.checked_add(header.string_info_offset as u64));
        match directory_end {
            Some(end) if end <= sir0.bytes().len() as u64 => (),
            _ => {
                return Err(MessageBinReadError::DirectoryOutOfBounds(
                    header.string_info_offset,
                    header.string_count,
                ))
            }
        }

        cursor.seek(SeekFrom::Start(header.string_info_offset as u64))?;
        let mut infos: Vec<StringInfo> = Vec::with_capacity(header.string_count as usize);
        for _ in 0..header.string_count {
            infos.push(cursor.read_le()?);
        }

        // rank of each record under the pointer ordering
        let mut by_pointer: Vec<usize> = (0..infos.len()).collect();
        by_pointer.sort_by_key(|&i| infos[i].pointer);
        let mut original_index = vec![0; infos.len()];
        for (rank, &i) in by_pointer.iter().enumerate() {
            original_index[i] = rank;
        }

        let mut entries = Vec::with_capacity(infos.len());
        let mut hash_to_index = BTreeMap::new();
        for (i, info) in infos.into_iter().enumerate() {
            cursor.seek(SeekFrom::Start(info.pointer as u64))?;
            let raw: NullWideString = cursor
                .read_le()
                .map_err(|_| MessageBinReadError::UnterminatedString(info.pointer))?;
            let allocated_len = 2 * (raw.len() + 1);
            let text = raw
                .to_string()
                .trim_matches(|c: char| c.is_ascii_whitespace())
                .to_string();
            hash_to_index.entry(info.hash).or_insert(i);
            entries.push(MessageBinEntry {
                pointer: info.pointer,
                hash: info.hash,
                unknown: info.unknown,
                allocated_len,
                original_index: original_index[i],
                text,
                edited: false,
            });
        }

        Ok(MessageBin {
            sir0,
            header_extension,
            entries,
            hash_to_index,
        })
    }

    /// return all the entries, in directory record order
    pub fn entries(&self) -> &[MessageBinEntry] {
        &self.entries
    }

    /// return all the entries mutably, in directory record order
    pub fn entries_mut(&mut self) -> &mut [MessageBinEntry] {
        &mut self.entries
    }

    /// return the entry at the given position of the directory
    pub fn entry_mut(&mut self, index: usize) -> Option<&mut MessageBinEntry> {
        self.entries.get_mut(index)
    }

    /// Return the message content with the given hash if it exist. If the
    /// file contain the same hash twice, the first record win.
    pub fn message_by_hash(&self, hash: u32) -> Option<&str> {
        self.hash_to_index
            .get(&hash)
            .map(|index| self.entries[*index].text())
    }

    /// return the number of strings in the file
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// return true if the file contain no string
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// return the current file image
    pub fn bytes(&self) -> &[u8] {
        self.sir0.bytes()
    }

    /// consume this MessageBin and return the file image
    pub fn into_bytes(self) -> Vec<u8> {
        self.sir0.into_bytes()
    }

    /// Rewrite every edited string inside its original slot.
    ///
    /// Each slot keep its position and length: the new text is encoded as
    /// UTF-16 little endian, truncated to the slot capacity (on a code unit
    /// boundary), null terminated and zero padded. Unedited entries, the
    /// directory, the Sir0 envelope and the pointer list are left untouched,
    /// so an unedited file save back byte for byte identical.
    ///
    /// The patch is assembled in a scratch buffer and committed in one go.
    /// Truncations are reported as [`PatchWarning`], they don't fail the
    /// save.
    pub fn save_in_place(&mut self) -> Vec<PatchWarning> {
        let mut warnings = Vec::new();
        let mut scratch = self.sir0.bytes().to_vec();
        for (entry_index, entry) in self.entries.iter().enumerate() {
            if !entry.edited {
                continue;
            }
            // the capacity is always even for a well formed file, round down
            // in case it is not
            let max_text_bytes = entry.capacity() & !1;
            let mut encoded = Vec::with_capacity(entry.allocated_len);
            for unit in entry.text.encode_utf16() {
                encoded.extend_from_slice(&unit.to_le_bytes());
            }
            if encoded.len() > max_text_bytes {
                warnings.push(PatchWarning {
                    entry_index,
                    hash: entry.hash,
                    lost_bytes: encoded.len() - max_text_bytes,
                });
                encoded.truncate(max_text_bytes);
            }
            encoded.push(0);
            encoded.push(0);
            encoded.resize(entry.allocated_len, 0);
            let start = entry.pointer as usize;
            scratch[start..start + entry.allocated_len].copy_from_slice(&encoded);
        }
        *self.sir0.bytes_mut() = scratch;
        for entry in &mut self.entries {
            entry.edited = false;
        }
        warnings
    }

    /// Serialise the messages into a freshly laid out file image.
    ///
    /// This is a full rebuild: every string get a new, tightly packed slot,
    /// the directory is sorted by hash and the pointer list is regenerated.
    /// Use it to grow strings past their slot. The in place save path never
    /// come through here.
    pub fn write<T: Seek + Write>(&self, file: &mut T) -> Result<(), MessageBinWriteError> {
        let mut by_pointer: Vec<&MessageBinEntry> = self.entries.iter().collect();
        by_pointer.sort_by_key(|entry| entry.original_index);
        write_image(
            file,
            by_pointer
                .into_iter()
                .map(|entry| (entry.hash, entry.unknown, entry.text.as_str())),
            &self.header_extension,
        )
    }

    /// Build a new file image from a list of (hash, unknown, text) and load
    /// it. Strings are laid out in the given order.
    pub fn from_messages(messages: &[(u32, u32, String)]) -> Result<Self, MessageBinWriteError> {
        let mut cursor = Cursor::new(Vec::new());
        write_image(
            &mut cursor,
            messages
                .iter()
                .map(|(hash, unknown, text)| (*hash, *unknown, text.as_str())),
            &[],
        )?;
        MessageBin::from_bytes(cursor.into_inner())
            .map_err(|err| MessageBinWriteError::Reparse(Box::new(err)))
    }
}

fn write_image<'a, T: Seek + Write>(
    file: &mut T,
    messages: impl Iterator<Item = (u32, u32, &'a str)>,
    header_extension: &[u8],
) -> Result<(), MessageBinWriteError> {
    let mut sir0_offsets: Vec<u64> = vec![4, 8];

    file.write_all(&[0; 16])?; // sir0 header, written last

    let mut infos = Vec::new();
    let mut text_current_offset: u32 = 16;
    for (hash, unknown, text) in messages {
        let mut encoded: Vec<u8> = Vec::with_capacity(text.len() * 2 + 2);
        for unit in text.encode_utf16() {
            encoded.extend_from_slice(&unit.to_le_bytes());
        }
        encoded.push(0);
        encoded.push(0);
        file.write_all(&encoded)?;
        infos.push(StringInfo {
            pointer: text_current_offset,
            hash,
            unknown,
        });
        text_current_offset = text_current_offset
            .checked_add(encoded.len().try_into()?)
            .map_or_else(|| Err(MessageBinWriteError::Overflow), Ok)?;
    }

    // align the directory on 4 bytes
    if text_current_offset % 4 != 0 {
        let padding = 4 - text_current_offset % 4;
        file.write_all(&vec![0; padding as usize])?;
    }

    // the game look strings up with a binary search over the hashes
    infos.sort_unstable_by_key(|info| info.hash);

    let info_offset: u32 = file.seek(SeekFrom::Current(0))?.try_into()?;
    infos.write(file)?;
    for count in 0..infos.len() {
        sir0_offsets.push(info_offset as u64 + count as u64 * 12);
    }

    let header_offset: u32 = file.seek(SeekFrom::Current(0))?.try_into()?;
    sir0_offsets.push(header_offset as u64 + 4);
    file.write_u32::<LE>(infos.len().try_into()?)?;
    file.write_u32::<LE>(info_offset)?;
    file.write_all(header_extension)?;

    let current_position = file.seek(SeekFrom::Current(0))?;
    if current_position % 16 != 0 {
        file.write_all(&vec![0; 16 - (current_position as usize % 16)])?;
    }

    let footer_offset: u32 = file.seek(SeekFrom::Current(0))?.try_into()?;
    write_sir0_footer(file, &sir0_offsets)?;

    file.seek(SeekFrom::Start(0))?;
    write_sir0_header(file, header_offset, footer_offset)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    // Hand assembled file with slack between the slots:
    //   0x00 sir0 header
    //   0x20 string "ab" padded with 5 spaces, 16 byte slot
    //   0x40 string "cd" padded with 9 spaces, 24 byte slot
    //   0x58 directory (2 records)
    //   0x70 content header, padded to 0x80
    //   0x80 pointer list
    fn two_entry_fixture() -> Vec<u8> {
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&0x70u32.to_le_bytes());
        file.extend_from_slice(&0x80u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.resize(0x20, 0);
        for unit in "ab     ".encode_utf16() {
            file.extend_from_slice(&unit.to_le_bytes());
        }
        file.extend_from_slice(&[0, 0]);
        file.resize(0x40, 0);
        for unit in "cd         ".encode_utf16() {
            file.extend_from_slice(&unit.to_le_bytes());
        }
        file.extend_from_slice(&[0, 0]);
        assert_eq!(file.len(), 0x58);
        // directory records are (pointer, hash, unknown)
        for record in &[(0x20u32, 0x111u32, 1u32), (0x40, 0x222, 2)] {
            file.extend_from_slice(&record.0.to_le_bytes());
            file.extend_from_slice(&record.1.to_le_bytes());
            file.extend_from_slice(&record.2.to_le_bytes());
        }
        file.extend_from_slice(&2u32.to_le_bytes());
        file.extend_from_slice(&0x58u32.to_le_bytes());
        file.resize(0x80, 0);
        // offsets 4, 8, 0x58, 0x64 and 0x74 hold pointers
        file.extend_from_slice(&[0x04, 0x04, 0x50, 0x0C, 0x10, 0x00]);
        file
    }

    #[test]
    fn test_load_two_entries() {
        let message_bin = MessageBin::from_bytes(two_entry_fixture()).unwrap();
        assert_eq!(message_bin.len(), 2);
        let first = &message_bin.entries()[0];
        assert_eq!(first.text(), "ab");
        assert_eq!(first.hash(), 0x111);
        assert_eq!(first.unknown(), 1);
        assert_eq!(first.pointer(), 0x20);
        assert_eq!(first.allocated_len(), 16);
        assert_eq!(first.capacity(), 14);
        assert_eq!(first.original_index(), 0);
        let second = &message_bin.entries()[1];
        assert_eq!(second.text(), "cd");
        assert_eq!(second.allocated_len(), 24);
        assert_eq!(second.original_index(), 1);
        assert_eq!(message_bin.message_by_hash(0x222), Some("cd"));
        assert_eq!(message_bin.message_by_hash(0x333), None);
    }

    #[test]
    fn test_untouched_save_is_identity() {
        let fixture = two_entry_fixture();
        let mut message_bin = MessageBin::load_file(&mut Cursor::new(fixture.as_slice())).unwrap();
        let warnings = message_bin.save_in_place();
        assert!(warnings.is_empty());
        assert_eq!(message_bin.bytes(), fixture.as_slice());
    }

    #[test]
    fn test_lenient_load() {
        // same pointer offsets as the fixture, with 0x58 listed twice (a
        // zero delta hidden behind a continuation bit)
        let mut file = two_entry_fixture();
        file.truncate(0x80);
        file.extend_from_slice(&[0x04, 0x04, 0x50, 0x80, 0x00, 0x0C, 0x10, 0x00]);
        match MessageBin::from_bytes(file.clone()) {
            Err(MessageBinReadError::Sir0Error(Sir0Error::UnsortedPointerOffset(0x58))) => (),
            other => panic!("{:?}", other),
        }
        let message_bin = MessageBin::from_bytes_lenient(file).unwrap();
        assert_eq!(message_bin.len(), 2);
        assert_eq!(message_bin.entries()[0].text(), "ab");
    }

    #[test]
    fn test_in_place_edit() {
        let fixture = two_entry_fixture();
        let mut message_bin = MessageBin::from_bytes(fixture.clone()).unwrap();
        message_bin.entry_mut(0).unwrap().set_text("XY");
        let warnings = message_bin.save_in_place();
        assert!(warnings.is_empty());

        let patched = message_bin.bytes();
        assert_eq!(&patched[0x20..0x24], &[0x58, 0x00, 0x59, 0x00]);
        assert_eq!(&patched[0x24..0x30], &[0; 12]);
        // every byte outside the edited slot is untouched
        assert_eq!(&patched[..0x20], &fixture[..0x20]);
        assert_eq!(&patched[0x30..], &fixture[0x30..]);
    }

    #[test]
    fn test_slot_overflow_truncate() {
        let mut message_bin = MessageBin::from_bytes(two_entry_fixture()).unwrap();
        // 20 units, 40 bytes of UTF-16, for a slot of capacity 14
        let long = "0123456789abcdefghij";
        message_bin.entry_mut(0).unwrap().set_text(long);
        let warnings = message_bin.save_in_place();
        assert_eq!(
            warnings,
            vec![PatchWarning {
                entry_index: 0,
                hash: 0x111,
                lost_bytes: 40 - 14
            }]
        );

        let patched = message_bin.bytes();
        let mut expected = Vec::new();
        for unit in "0123456".encode_utf16() {
            expected.extend_from_slice(&unit.to_le_bytes());
        }
        expected.extend_from_slice(&[0, 0]);
        assert_eq!(&patched[0x20..0x30], expected.as_slice());

        // the truncated slot still parse, with the same allocated length
        let reparsed = MessageBin::from_bytes(patched.to_vec()).unwrap();
        assert_eq!(reparsed.entries()[0].text(), "0123456");
        assert_eq!(reparsed.entries()[0].allocated_len(), 16);
    }

    #[test]
    fn test_empty_file() {
        // a string_count of 0 and a pointer list reduced to its terminator
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&0x10u32.to_le_bytes());
        file.extend_from_slice(&0x18u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&0u32.to_le_bytes());
        file.extend_from_slice(&0x10u32.to_le_bytes());
        file.extend_from_slice(&[0x00]);

        let mut message_bin = MessageBin::from_bytes(file.clone()).unwrap();
        assert!(message_bin.is_empty());
        let warnings = message_bin.save_in_place();
        assert!(warnings.is_empty());
        assert_eq!(message_bin.bytes(), file.as_slice());
    }

    #[test]
    fn test_original_index_is_a_permutation() {
        // the directory end up in hash order, the payload keep its order
        let message_bin = MessageBin::from_messages(&[
            (3, 0, "third".to_string()),
            (1, 0, "first".to_string()),
            (2, 0, "second".to_string()),
        ])
        .unwrap();
        let mut ranks: Vec<usize> = message_bin
            .entries()
            .iter()
            .map(|entry| entry.original_index())
            .collect();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2]);
        let mut by_rank: Vec<(usize, &str)> = message_bin
            .entries()
            .iter()
            .map(|entry| (entry.original_index(), entry.text()))
            .collect();
        by_rank.sort_unstable();
        assert_eq!(by_rank, vec![(0, "third"), (1, "first"), (2, "second")]);
    }

    #[test]
    fn test_rebuild_round_trip() {
        let message_bin = MessageBin::from_messages(&[
            (0xCAFE, 7, "hello".to_string()),
            (0xBEEF, 0, "世界".to_string()),
        ])
        .unwrap();
        let mut cursor = Cursor::new(Vec::new());
        message_bin.write(&mut cursor).unwrap();
        let reparsed = MessageBin::from_bytes(cursor.into_inner()).unwrap();
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed.message_by_hash(0xCAFE), Some("hello"));
        assert_eq!(reparsed.message_by_hash(0xBEEF), Some("世界"));
        assert_eq!(
            reparsed
                .entries()
                .iter()
                .map(|entry| entry.unknown())
                .sum::<u32>(),
            7
        );
    }

    #[test]
    fn test_load_trim_and_lossy_decode() {
        // surrounding ascii whitespace is trimmed away when surfaced
        let message_bin = MessageBin::from_messages(&[(9, 0, "  hi \u{9}".to_string())]).unwrap();
        assert_eq!(message_bin.entries()[0].text(), "hi");

        // an unpaired high surrogate decode as U+FFFD
        let mut corrupted = message_bin.into_bytes();
        // the only string start right after the sir0 header
        corrupted[0x10..0x12].copy_from_slice(&0xD800u16.to_le_bytes());
        let mut reparsed = MessageBin::from_bytes(corrupted.clone()).unwrap();
        assert!(reparsed.entries()[0].text().contains('\u{FFFD}'));

        // an unedited lossy entry still save back byte identical
        assert!(reparsed.save_in_place().is_empty());
        assert_eq!(reparsed.bytes(), corrupted.as_slice());
    }

    #[test]
    fn test_reject_directory_out_of_bounds() {
        let mut file = Vec::new();
        file.extend_from_slice(b"SIR0");
        file.extend_from_slice(&0x10u32.to_le_bytes());
        file.extend_from_slice(&0x18u32.to_le_bytes());
        file.extend_from_slice(&[0; 4]);
        file.extend_from_slice(&1000u32.to_le_bytes());
        file.extend_from_slice(&0x10u32.to_le_bytes());
        file.extend_from_slice(&[0x00]);
        match MessageBin::from_bytes(file) {
            Err(MessageBinReadError::DirectoryOutOfBounds(0x10, 1000)) => (),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn test_reject_unterminated_string() {
        // append two non null bytes after the pointer list terminator and
        // make the second string point at them, no null unit can be found
        let mut file = two_entry_fixture();
        file.extend_from_slice(&[0x41, 0x01]);
        let tail = (file.len() - 2) as u32;
        file[0x64..0x68].copy_from_slice(&tail.to_le_bytes());
        match MessageBin::from_bytes(file) {
            Err(MessageBinReadError::UnterminatedString(_)) => (),
            other => panic!("{:?}", other),
        }
    }
}
