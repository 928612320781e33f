//! The catalog of named field mutations.
//!
//! Each mutation rewrites one header field in place to a boundary or edge
//! value. The catalog is a tagged enum rather than a table of function
//! pointers; the variant order of [`Mutation::GENERIC`] is part of the
//! observable behavior, because crash files are named after the label of
//! the test that produced them and labels are emitted in catalog order.

use tar_record::ARTIFACT_EXT;

/// A single named transformation of one header field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Zero-fill the field.
    Empty,
    /// A short non-numeric string ("hello") in the first bytes.
    NotNumeric,
    /// The maximum octal digit '7' for width−1 bytes, NUL-terminated.
    Big,
    /// The non-octal digit '9' for width−1 bytes, NUL-terminated.
    NotOctal,
    /// A digit across the entire width, no NUL terminator anywhere.
    NotTerminated,
    /// Zero-fill, then '2' in the first half only: the NUL lands
    /// mid-field instead of at the end.
    MiddleNull,
    /// Same shape as [`Mutation::MiddleNull`] with fill character '0'.
    ZeroMiddleNull,
    /// Multi-byte non-ASCII content (an emoji).
    NotAscii,
    /// '0' for width−1 bytes, NUL-terminated.
    AllZero,
    /// NULs everywhere except a '0' in the very last byte.
    AllNullButEndZero,
    /// A zero-padded decimal number filling the field, leaving exactly
    /// enough room for the artifact extension appended at the end.
    FillAll,
    /// A path-like string ending in '/'.
    Directory,
    /// The field preset to `"0.txt"` with the first byte forced to the
    /// given control or high-bit value.
    WeirdChar(u8),
    /// Like [`Mutation::WeirdChar`] but sweeping the fixed forbidden set.
    ForbiddenChar(u8),
}

impl Mutation {
    /// The generic battery applied to every swept field, in order.
    pub const GENERIC: [Mutation; 10] = [
        Mutation::Empty,
        Mutation::NotNumeric,
        Mutation::Big,
        Mutation::NotOctal,
        Mutation::NotTerminated,
        Mutation::MiddleNull,
        Mutation::ZeroMiddleNull,
        Mutation::NotAscii,
        Mutation::AllZero,
        Mutation::AllNullButEndZero,
    ];

    /// Characters no well-formed entry name should contain.
    pub const FORBIDDEN_CHARS: [u8; 6] = [b'*', b'\\', b'/', b'"', b'?', b' '];

    /// One [`Mutation::WeirdChar`] per control byte (0–31) and per byte
    /// value 127–255: 161 cases.
    pub fn weird_chars() -> impl Iterator<Item = Mutation> {
        (0u8..=31).chain(127u8..=255).map(Mutation::WeirdChar)
    }

    /// One [`Mutation::ForbiddenChar`] per entry of
    /// [`Mutation::FORBIDDEN_CHARS`], in order.
    pub fn forbidden_chars() -> impl Iterator<Item = Mutation> {
        Self::FORBIDDEN_CHARS.into_iter().map(Mutation::ForbiddenChar)
    }

    /// The label this mutation contributes to the test name (and to the
    /// crash file name, should the extractor crash on it).
    ///
    /// Weird characters are rendered as hex so that persisted crash files
    /// never carry control characters in their names; the forbidden set is
    /// printable and keeps the quoted-character form, except '/', which
    /// would put a path separator into the crash file name and break the
    /// rename.
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Mutation::Empty => "empty".to_string(),
            Mutation::NotNumeric => "not_numeric".to_string(),
            Mutation::Big => "big".to_string(),
            Mutation::NotOctal => "not_octal".to_string(),
            Mutation::NotTerminated => "not_terminated".to_string(),
            Mutation::MiddleNull => "middle_null_termination".to_string(),
            Mutation::ZeroMiddleNull => "0_and_middle_null_termination".to_string(),
            Mutation::NotAscii => "not_ascii".to_string(),
            Mutation::AllZero => "all_0".to_string(),
            Mutation::AllNullButEndZero => "all_null_but_end_0".to_string(),
            Mutation::FillAll => "fill_all".to_string(),
            Mutation::Directory => "directory".to_string(),
            Mutation::WeirdChar(byte) | Mutation::ForbiddenChar(byte @ b'/') => {
                format!("weird_char=0x{byte:02x}")
            }
            Mutation::ForbiddenChar(byte) => format!("weird_char='{}'", byte as char),
        }
    }

    /// Rewrite `field` in place.
    pub fn apply(self, field: &mut [u8]) {
        let width = field.len();
        match self {
            Mutation::Empty => field.fill(0),
            Mutation::NotNumeric => copy_padded(field, b"hello"),
            Mutation::Big => {
                field[..width - 1].fill(b'7');
                field[width - 1] = 0;
            }
            Mutation::NotOctal => {
                field[..width - 1].fill(b'9');
                field[width - 1] = 0;
            }
            Mutation::NotTerminated => field.fill(b'4'),
            Mutation::MiddleNull => {
                field.fill(0);
                field[..width / 2].fill(b'2');
            }
            Mutation::ZeroMiddleNull => {
                field.fill(0);
                field[..width / 2].fill(b'0');
            }
            Mutation::NotAscii => copy_padded(field, "😂".as_bytes()),
            Mutation::AllZero => {
                field[..width - 1].fill(b'0');
                field[width - 1] = 0;
            }
            Mutation::AllNullButEndZero => {
                field.fill(0);
                field[width - 1] = b'0';
            }
            Mutation::FillAll => {
                let digits = width.saturating_sub(ARTIFACT_EXT.len() + 1);
                let text = format!("{:0digits$}{ARTIFACT_EXT}", 0);
                copy_padded(field, text.as_bytes());
            }
            Mutation::Directory => copy_padded(field, format!("tests{ARTIFACT_EXT}/").as_bytes()),
            Mutation::WeirdChar(byte) | Mutation::ForbiddenChar(byte) => {
                copy_padded(field, format!("0{ARTIFACT_EXT}").as_bytes());
                field[0] = byte;
            }
        }
    }
}

/// `strncpy`-style copy: up to `field.len()` bytes of `value`, with the
/// remainder of the field zero-filled. A value longer than the field is
/// silently truncated with no terminator, which is exactly the unterminated
/// edge the short fields are supposed to exercise.
fn copy_padded(field: &mut [u8], value: &[u8]) {
    let n = value.len().min(field.len());
    field[..n].copy_from_slice(&value[..n]);
    field[n..].fill(0);
}
