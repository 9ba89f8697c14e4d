//! Raw byte → [`Key`] decoding.
//!
//! A [`KeyTable`] is a trie keyed by raw bytes. Each entry is either a
//! key or a nested table consulted with the next byte. Two conventions
//! ship with the crate:
//!
//! - [`KeyTable::vt100`]: escape-prefixed sequences as sent by Unix
//!   terminals (`ESC [ A` = up). Native on everything but Windows.
//! - [`KeyTable::console`]: DOS/Windows console scan codes, where `0xE0`
//!   and `0x00` introduce navigation and function keys. Native on Windows.
//!
//! Decoding is total. When the trie has nothing to say the decoder falls
//! back to a literal:
//!
//! - an unmapped first byte is read as a character (ASCII, or a complete
//!   UTF-8 sequence when its continuation bytes are pending), otherwise
//!   [`Key::Byte`];
//! - a prefix with no byte arriving within [`SEQUENCE_GRACE`] resolves
//!   to the prefix's own key if it has one (VT100 `ESC` alone is
//!   `escape`), otherwise to the
//!   literal of the prefix byte;
//! - a byte unmapped within a nested table resolves to its own literal.

use std::collections::{BTreeMap, VecDeque};
use std::io;
use std::time::Duration;

use crate::keys::Key;

// ============================================================================
// BYTE SOURCE
// ============================================================================

/// Where raw input bytes come from.
pub trait ByteSource {
    /// Whether at least one byte can be read without blocking. Waits up to
    /// `timeout` for one to arrive; a zero timeout never blocks.
    fn poll(&mut self, timeout: Duration) -> io::Result<bool>;

    /// Read one byte, blocking until it is available.
    fn read_byte(&mut self) -> io::Result<u8>;
}

/// Scripted input. Reading past the end is an `UnexpectedEof` error.
impl ByteSource for VecDeque<u8> {
    fn poll(&mut self, _timeout: Duration) -> io::Result<bool> {
        Ok(!self.is_empty())
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        self.pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "input exhausted"))
    }
}

// ============================================================================
// TABLE
// ============================================================================

/// One entry of the trie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyNode {
    Key(Key),
    Prefix {
        /// Key produced when nothing follows the prefix byte.
        alone: Option<Key>,
        next: BTreeMap<u8, KeyNode>,
    },
}

/// Which byte convention a table follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Convention {
    Vt100,
    Console,
}

impl Convention {
    /// The convention of the platform this crate was compiled for.
    pub fn native() -> Self {
        if cfg!(windows) {
            Convention::Console
        } else {
            Convention::Vt100
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Convention::Vt100 => "vt100",
            Convention::Console => "console",
        }
    }
}

impl std::fmt::Display for Convention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Byte trie mapping raw input to keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyTable {
    root: BTreeMap<u8, KeyNode>,
}

/// Control codes that keep their conventional meaning instead of ctrl+letter.
const RESERVED_CONTROL: [u8; 3] = [0x08, 0x09, 0x0d];

fn ctrl_letters(root: &mut BTreeMap<u8, KeyNode>) {
    for byte in 0x01..=0x1au8 {
        if !RESERVED_CONTROL.contains(&byte) {
            root.insert(byte, KeyNode::Key(Key::Ctrl((b'a' + byte - 1) as char)));
        }
    }
}

fn table<const N: usize>(entries: [(u8, Key); N]) -> BTreeMap<u8, KeyNode> {
    entries.into_iter().map(|(b, k)| (b, KeyNode::Key(k))).collect()
}

/// Insert a multi-byte sequence, creating intermediate prefixes.
fn insert_sequence(map: &mut BTreeMap<u8, KeyNode>, bytes: &[u8], key: Key) {
    match bytes {
        [] => {}
        [last] => {
            map.insert(*last, KeyNode::Key(key));
        }
        [first, rest @ ..] => {
            let node = map.entry(*first).or_insert_with(|| KeyNode::Prefix {
                alone: None,
                next: BTreeMap::new(),
            });
            if let KeyNode::Prefix { next, .. } = node {
                insert_sequence(next, rest, key);
            }
        }
    }
}

impl KeyTable {
    /// Table for `convention`.
    pub fn for_convention(convention: Convention) -> Self {
        match convention {
            Convention::Vt100 => Self::vt100(),
            Convention::Console => Self::console(),
        }
    }

    /// Table for the platform this crate was compiled for.
    pub fn native() -> Self {
        Self::for_convention(Convention::native())
    }

    /// Unix terminal sequences.
    pub fn vt100() -> Self {
        let mut root = table([
            (b' ', Key::Space),
            (0x0d, Key::Enter),
            (0x09, Key::Tab),
            (0x08, Key::Backspace),
            (0x7f, Key::Backspace),
        ]);
        ctrl_letters(&mut root);

        let mut csi = table([
            (b'A', Key::Up),
            (b'B', Key::Down),
            (b'C', Key::Right),
            (b'D', Key::Left),
            (b'E', Key::Center),
            (b'H', Key::Home),
            (b'F', Key::End),
        ]);
        for (digits, key) in [
            ("1", Key::Home),
            ("2", Key::Insert),
            ("3", Key::Delete),
            ("4", Key::End),
            ("5", Key::PageUp),
            ("6", Key::PageDown),
            ("7", Key::Home),
            ("8", Key::End),
            ("11", Key::F(1)),
            ("12", Key::F(2)),
            ("13", Key::F(3)),
            ("14", Key::F(4)),
            ("15", Key::F(5)),
            ("17", Key::F(6)),
            ("18", Key::F(7)),
            ("19", Key::F(8)),
            ("20", Key::F(9)),
            ("21", Key::F(10)),
            ("23", Key::F(11)),
            ("24", Key::F(12)),
        ] {
            insert_sequence(&mut csi, format!("{digits}~").as_bytes(), key);
        }

        let ss3 = table([
            (b'P', Key::F(1)),
            (b'Q', Key::F(2)),
            (b'R', Key::F(3)),
            (b'S', Key::F(4)),
            (b'H', Key::Home),
            (b'F', Key::End),
        ]);

        let mut escape = BTreeMap::new();
        escape.insert(b'[', KeyNode::Prefix { alone: None, next: csi });
        escape.insert(b'O', KeyNode::Prefix { alone: None, next: ss3 });
        root.insert(
            0x1b,
            KeyNode::Prefix {
                alone: Some(Key::Escape),
                next: escape,
            },
        );

        KeyTable { root }
    }

    /// DOS/Windows console scan codes.
    pub fn console() -> Self {
        let mut root = table([
            (b' ', Key::Space),
            (0x0d, Key::Enter),
            (0x09, Key::Tab),
            (0x1b, Key::Escape),
            (0x08, Key::Backspace),
        ]);
        ctrl_letters(&mut root);

        let extended = table([
            (0x47, Key::Home),
            (0x48, Key::Up),
            (0x49, Key::PageUp),
            (0x4b, Key::Left),
            (0x4c, Key::Center),
            (0x4d, Key::Right),
            (0x4f, Key::End),
            (0x50, Key::Down),
            (0x51, Key::PageDown),
            (0x52, Key::Insert),
            (0x53, Key::Delete),
            (0x85, Key::F(11)),
            (0x86, Key::F(12)),
        ]);
        let function = table([
            (0x3b, Key::F(1)),
            (0x3c, Key::F(2)),
            (0x3d, Key::F(3)),
            (0x3e, Key::F(4)),
            (0x3f, Key::F(5)),
            (0x40, Key::F(6)),
            (0x41, Key::F(7)),
            (0x42, Key::F(8)),
            (0x43, Key::F(9)),
            (0x44, Key::F(10)),
            (0x48, Key::Up),
            (0x4b, Key::Left),
            (0x4c, Key::Center),
            (0x4d, Key::Right),
            (0x50, Key::Down),
        ]);

        root.insert(0xe0, KeyNode::Prefix { alone: None, next: extended });
        root.insert(0x00, KeyNode::Prefix { alone: None, next: function });

        KeyTable { root }
    }

    /// Look up the first byte.
    pub fn get(&self, byte: u8) -> Option<&KeyNode> {
        self.root.get(&byte)
    }

    /// Every complete byte sequence in the table with the key it decodes
    /// to, in byte order. Prefixes with a key of their own are listed too.
    pub fn entries(&self) -> Vec<(Vec<u8>, Key)> {
        fn walk(map: &BTreeMap<u8, KeyNode>, path: &mut Vec<u8>, out: &mut Vec<(Vec<u8>, Key)>) {
            for (byte, node) in map {
                path.push(*byte);
                match node {
                    KeyNode::Key(key) => out.push((path.clone(), *key)),
                    KeyNode::Prefix { alone, next } => {
                        if let Some(key) = alone {
                            out.push((path.clone(), *key));
                        }
                        walk(next, path, out);
                    }
                }
                path.pop();
            }
        }
        let mut out = Vec::new();
        walk(&self.root, &mut Vec::new(), &mut out);
        out
    }
}

impl Default for KeyTable {
    fn default() -> Self {
        Self::native()
    }
}

// ============================================================================
// DECODER
// ============================================================================

/// Pull-based decoder over a byte source.
pub struct KeyDecoder {
    table: KeyTable,
    source: Box<dyn ByteSource>,
}

impl KeyDecoder {
    pub fn new(table: KeyTable, source: impl ByteSource + 'static) -> Self {
        KeyDecoder {
            table,
            source: Box::new(source),
        }
    }

    /// Whether a key can be decoded, waiting up to `timeout` for input.
    pub fn has_key(&mut self, timeout: Duration) -> io::Result<bool> {
        self.source.poll(timeout)
    }

    /// Decode the next key, consuming as many bytes as the table dictates.
    /// Blocks until the first byte arrives.
    pub fn next_key(&mut self) -> io::Result<Key> {
        let key = decode(&self.table, self.source.as_mut())?;
        tracing::trace!(%key, "decoded key");
        Ok(key)
    }

    pub fn table(&self) -> &KeyTable {
        &self.table
    }

    /// Direct access to the input, for request/response exchanges such as
    /// [`Output::cursor_position`](crate::output::Output::cursor_position).
    pub fn source_mut(&mut self) -> &mut dyn ByteSource {
        self.source.as_mut()
    }
}

/// How long the decoder waits for the rest of a multi-byte sequence once
/// its first byte has arrived. Terminals reached over a network can split
/// `ESC [ A` across reads.
pub const SEQUENCE_GRACE: Duration = Duration::from_millis(25);

/// Decode one key from `source` using `table`.
pub fn decode(table: &KeyTable, source: &mut dyn ByteSource) -> io::Result<Key> {
    let first = source.read_byte()?;
    let mut last = first;
    let mut node = table.root.get(&first);
    let mut depth = 0;

    loop {
        match node {
            Some(KeyNode::Key(key)) => return Ok(*key),
            Some(KeyNode::Prefix { alone, next }) => {
                if !source.poll(SEQUENCE_GRACE)? {
                    return Ok(alone.unwrap_or_else(|| ascii_literal(last)));
                }
                last = source.read_byte()?;
                node = next.get(&last);
                depth += 1;
            }
            None if depth == 0 => return literal(last, source),
            None => return Ok(ascii_literal(last)),
        }
    }
}

fn ascii_literal(byte: u8) -> Key {
    if byte.is_ascii() && !byte.is_ascii_control() {
        Key::Char(byte as char)
    } else {
        Key::Byte(byte)
    }
}

/// Literal for an unmapped leading byte, completing UTF-8 sequences whose
/// continuation bytes are already pending.
fn literal(first: u8, source: &mut dyn ByteSource) -> io::Result<Key> {
    let needed = match first {
        0xc2..=0xdf => 1,
        0xe0..=0xef => 2,
        0xf0..=0xf4 => 3,
        _ => return Ok(ascii_literal(first)),
    };

    let mut bytes = vec![first];
    for _ in 0..needed {
        if !source.poll(SEQUENCE_GRACE)? {
            return Ok(Key::Byte(first));
        }
        bytes.push(source.read_byte()?);
    }
    Ok(std::str::from_utf8(&bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .map_or(Key::Byte(first), Key::Char))
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(table: &KeyTable, bytes: &[u8]) -> Vec<Key> {
        let mut source: VecDeque<u8> = bytes.iter().copied().collect();
        let mut keys = Vec::new();
        while source.poll(Duration::ZERO).unwrap() {
            keys.push(decode(table, &mut source).unwrap());
        }
        keys
    }

    fn one(table: &KeyTable, bytes: &[u8]) -> Key {
        let keys = decode_all(table, bytes);
        assert_eq!(keys.len(), 1, "{bytes:02x?} decoded to {keys:?}");
        keys[0]
    }

    #[test]
    fn vt100_table_is_pinned() {
        let expected: Vec<(&[u8], Key)> = vec![
            (b"\x01", Key::Ctrl('a')),
            (b"\x02", Key::Ctrl('b')),
            (b"\x03", Key::Ctrl('c')),
            (b"\x04", Key::Ctrl('d')),
            (b"\x05", Key::Ctrl('e')),
            (b"\x06", Key::Ctrl('f')),
            (b"\x07", Key::Ctrl('g')),
            (b"\x08", Key::Backspace),
            (b"\x09", Key::Tab),
            (b"\x0a", Key::Ctrl('j')),
            (b"\x0b", Key::Ctrl('k')),
            (b"\x0c", Key::Ctrl('l')),
            (b"\x0d", Key::Enter),
            (b"\x0e", Key::Ctrl('n')),
            (b"\x0f", Key::Ctrl('o')),
            (b"\x10", Key::Ctrl('p')),
            (b"\x11", Key::Ctrl('q')),
            (b"\x12", Key::Ctrl('r')),
            (b"\x13", Key::Ctrl('s')),
            (b"\x14", Key::Ctrl('t')),
            (b"\x15", Key::Ctrl('u')),
            (b"\x16", Key::Ctrl('v')),
            (b"\x17", Key::Ctrl('w')),
            (b"\x18", Key::Ctrl('x')),
            (b"\x19", Key::Ctrl('y')),
            (b"\x1a", Key::Ctrl('z')),
            (b"\x1b", Key::Escape),
            (b"\x1bOF", Key::End),
            (b"\x1bOH", Key::Home),
            (b"\x1bOP", Key::F(1)),
            (b"\x1bOQ", Key::F(2)),
            (b"\x1bOR", Key::F(3)),
            (b"\x1bOS", Key::F(4)),
            (b"\x1b[1~", Key::Home),
            (b"\x1b[11~", Key::F(1)),
            (b"\x1b[12~", Key::F(2)),
            (b"\x1b[13~", Key::F(3)),
            (b"\x1b[14~", Key::F(4)),
            (b"\x1b[15~", Key::F(5)),
            (b"\x1b[17~", Key::F(6)),
            (b"\x1b[18~", Key::F(7)),
            (b"\x1b[19~", Key::F(8)),
            (b"\x1b[2~", Key::Insert),
            (b"\x1b[20~", Key::F(9)),
            (b"\x1b[21~", Key::F(10)),
            (b"\x1b[23~", Key::F(11)),
            (b"\x1b[24~", Key::F(12)),
            (b"\x1b[3~", Key::Delete),
            (b"\x1b[4~", Key::End),
            (b"\x1b[5~", Key::PageUp),
            (b"\x1b[6~", Key::PageDown),
            (b"\x1b[7~", Key::Home),
            (b"\x1b[8~", Key::End),
            (b"\x1b[A", Key::Up),
            (b"\x1b[B", Key::Down),
            (b"\x1b[C", Key::Right),
            (b"\x1b[D", Key::Left),
            (b"\x1b[E", Key::Center),
            (b"\x1b[F", Key::End),
            (b"\x1b[H", Key::Home),
            (b" ", Key::Space),
            (b"\x7f", Key::Backspace),
        ];

        let table = KeyTable::vt100();
        let entries = table.entries();
        let as_vecs: Vec<(Vec<u8>, Key)> = expected.iter().map(|(b, k)| (b.to_vec(), *k)).collect();
        let mut sorted_expected = as_vecs.clone();
        sorted_expected.sort_by(|a, b| a.0.cmp(&b.0));
        assert_eq!(entries, sorted_expected);

        for (bytes, key) in &as_vecs {
            assert_eq!(one(&table, bytes), *key, "sequence {bytes:02x?}");
        }
    }

    #[test]
    fn console_table_is_pinned() {
        let mut expected: Vec<(Vec<u8>, Key)> = vec![
            (vec![0x00, 0x3b], Key::F(1)),
            (vec![0x00, 0x3c], Key::F(2)),
            (vec![0x00, 0x3d], Key::F(3)),
            (vec![0x00, 0x3e], Key::F(4)),
            (vec![0x00, 0x3f], Key::F(5)),
            (vec![0x00, 0x40], Key::F(6)),
            (vec![0x00, 0x41], Key::F(7)),
            (vec![0x00, 0x42], Key::F(8)),
            (vec![0x00, 0x43], Key::F(9)),
            (vec![0x00, 0x44], Key::F(10)),
            (vec![0x00, 0x48], Key::Up),
            (vec![0x00, 0x4b], Key::Left),
            (vec![0x00, 0x4c], Key::Center),
            (vec![0x00, 0x4d], Key::Right),
            (vec![0x00, 0x50], Key::Down),
            (vec![0x08], Key::Backspace),
            (vec![0x09], Key::Tab),
            (vec![0x0d], Key::Enter),
            (vec![0x1b], Key::Escape),
            (vec![0x20], Key::Space),
            (vec![0xe0, 0x47], Key::Home),
            (vec![0xe0, 0x48], Key::Up),
            (vec![0xe0, 0x49], Key::PageUp),
            (vec![0xe0, 0x4b], Key::Left),
            (vec![0xe0, 0x4c], Key::Center),
            (vec![0xe0, 0x4d], Key::Right),
            (vec![0xe0, 0x4f], Key::End),
            (vec![0xe0, 0x50], Key::Down),
            (vec![0xe0, 0x51], Key::PageDown),
            (vec![0xe0, 0x52], Key::Insert),
            (vec![0xe0, 0x53], Key::Delete),
            (vec![0xe0, 0x85], Key::F(11)),
            (vec![0xe0, 0x86], Key::F(12)),
        ];
        for byte in 0x01..=0x1au8 {
            if ![0x08, 0x09, 0x0d].contains(&byte) {
                expected.push((vec![byte], Key::Ctrl((b'a' + byte - 1) as char)));
            }
        }
        expected.sort_by(|a, b| a.0.cmp(&b.0));

        let table = KeyTable::console();
        assert_eq!(table.entries(), expected);
        for (bytes, key) in &expected {
            assert_eq!(one(&table, bytes), *key, "sequence {bytes:02x?}");
        }
    }

    #[test]
    fn same_bytes_differ_between_conventions() {
        assert_eq!(one(&KeyTable::vt100(), b"\x1b[A"), Key::Up);
        // Console: escape, then two literals.
        assert_eq!(
            decode_all(&KeyTable::console(), b"\x1b[A"),
            vec![Key::Escape, Key::Char('['), Key::Char('A')]
        );
    }

    #[test]
    fn ctrl_letters_skip_reserved_codes() {
        let table = KeyTable::vt100();
        assert_eq!(one(&table, b"\x08"), Key::Backspace);
        assert_eq!(one(&table, b"\x09"), Key::Tab);
        assert_eq!(one(&table, b"\x0d"), Key::Enter);
        assert_eq!(one(&table, b"\x1a"), Key::Ctrl('z'));
    }

    #[test]
    fn printable_ascii_passes_through() {
        let keys = decode_all(&KeyTable::vt100(), b"a1Z~");
        assert_eq!(keys, vec![Key::Char('a'), Key::Char('1'), Key::Char('Z'), Key::Char('~')]);
    }

    #[test]
    fn utf8_sequences_decode_to_one_char() {
        assert_eq!(one(&KeyTable::vt100(), "é".as_bytes()), Key::Char('é'));
        assert_eq!(one(&KeyTable::vt100(), "€".as_bytes()), Key::Char('€'));
    }

    #[test]
    fn unmapped_follow_byte_falls_back_to_literal() {
        // Alt+x on a VT100 terminal.
        assert_eq!(one(&KeyTable::vt100(), b"\x1bx"), Key::Char('x'));
        // Console extended prefix followed by an unknown scan code.
        assert_eq!(one(&KeyTable::console(), &[0xe0, 0x01]), Key::Byte(0x01));
        assert_eq!(one(&KeyTable::console(), &[0x00, b'q']), Key::Char('q'));
    }

    #[test]
    fn truncated_prefix_falls_back_to_literals() {
        assert_eq!(one(&KeyTable::console(), &[0xe0]), Key::Byte(0xe0));
        assert_eq!(one(&KeyTable::vt100(), b"\x1b["), Key::Char('['));
        assert_eq!(one(&KeyTable::vt100(), b"\x1b[1"), Key::Char('1'));
    }

    /// Input delivered in two reads: `late` only shows up for a poll that
    /// waits at least the sequence grace.
    struct SplitRead {
        ready: VecDeque<u8>,
        late: VecDeque<u8>,
    }

    impl SplitRead {
        fn new(ready: &[u8], late: &[u8]) -> Self {
            SplitRead {
                ready: ready.iter().copied().collect(),
                late: late.iter().copied().collect(),
            }
        }
    }

    impl ByteSource for SplitRead {
        fn poll(&mut self, timeout: Duration) -> io::Result<bool> {
            if self.ready.is_empty() && timeout >= SEQUENCE_GRACE {
                self.ready.append(&mut self.late);
            }
            Ok(!self.ready.is_empty())
        }

        fn read_byte(&mut self) -> io::Result<u8> {
            self.ready.read_byte()
        }
    }

    #[test]
    fn sequences_split_across_reads_still_decode() {
        let table = KeyTable::vt100();
        assert_eq!(decode(&table, &mut SplitRead::new(b"\x1b", b"[A")).unwrap(), Key::Up);
        assert_eq!(decode(&table, &mut SplitRead::new(b"\x1b[", b"15~")).unwrap(), Key::F(5));
        assert_eq!(decode(&table, &mut SplitRead::new(&[0xc3], &[0xa9])).unwrap(), Key::Char('é'));
        assert_eq!(decode(&table, &mut SplitRead::new(b"\x1b", b"")).unwrap(), Key::Escape);
    }

    #[test]
    fn decoder_polls_then_pulls() {
        let source: VecDeque<u8> = b"\x1b[Bq".iter().copied().collect();
        let mut decoder = KeyDecoder::new(KeyTable::vt100(), source);
        assert!(decoder.has_key(Duration::ZERO).unwrap());
        assert_eq!(decoder.next_key().unwrap(), Key::Down);
        assert_eq!(decoder.next_key().unwrap(), Key::Char('q'));
        assert!(!decoder.has_key(Duration::ZERO).unwrap());
    }

    #[test]
    fn decoding_is_total_and_deterministic_over_every_byte_pair() {
        for table in [KeyTable::vt100(), KeyTable::console()] {
            for a in 0..=255u8 {
                for b in [0x00, 0x1b, b'[', b'A', 0x48, 0x7f, 0xe0, 0xff] {
                    let first = decode_all(&table, &[a, b]);
                    let second = decode_all(&table, &[a, b]);
                    assert!(!first.is_empty());
                    assert_eq!(first, second);
                }
            }
        }
    }
}
