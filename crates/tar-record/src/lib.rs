//! Byte-exact UStar header construction.
//!
//! This crate builds 512-byte tar header blocks with full control over every
//! field, including control over fields that no sane archiver would ever
//! emit. It is the codec half of a robustness harness for tar extractors:
//! rather than parsing and validating archives, it *produces* them, and it
//! deliberately performs no validation of its own — encoding a negative size
//! or a corrupted checksum is a feature, not an error.
//!
//! # Header Field Layout
//!
//! | Offset | Size | Field     | Encoding                                 |
//! |--------|------|-----------|------------------------------------------|
//! | 0      | 100  | name      | NUL-padded string                        |
//! | 100    | 8    | mode      | NUL-padded octal ASCII                   |
//! | 108    | 8    | uid       | NUL-padded octal ASCII                   |
//! | 116    | 8    | gid       | NUL-padded octal ASCII                   |
//! | 124    | 12   | size      | NUL-padded octal ASCII                   |
//! | 136    | 12   | mtime     | NUL-padded octal ASCII                   |
//! | 148    | 8    | chksum    | 6 octal digits, NUL, space               |
//! | 156    | 1    | typeflag  | single byte, see [`TYPEFLAGS`]           |
//! | 157    | 100  | linkname  | NUL-padded string                        |
//! | 257    | 6    | magic     | `"ustar\0"`                              |
//! | 263    | 2    | version   | `"00"`                                   |
//! | 265    | 32   | uname     | NUL-padded string                        |
//! | 297    | 32   | gname     | NUL-padded string                        |
//! | 329    | 8    | devmajor  | NUL-padded octal ASCII                   |
//! | 337    | 8    | devminor  | NUL-padded octal ASCII                   |
//! | 345    | 155  | prefix    | reserved, zero                           |
//! | 500    | 12   | pad       | reserved, zero                           |
//!
//! # Checksum Protocol
//!
//! The chksum field of a freshly built record holds the sentinel value
//! [`CHECKSUM_SENTINEL`] (`"docheck\0"`), which tells the [`writer`] to
//! compute the real checksum at serialization time. The serialized copy
//! carries the computed value; the in-memory record keeps the sentinel, so
//! writing a header is free of side effects. Any chksum value *other* than
//! the sentinel — including one a test has corrupted on purpose — is
//! written byte-for-byte unmodified.

pub mod writer;

use std::fmt;
use std::ops::Range;

use rand::Rng;
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Size of a tar header block in bytes.
pub const BLOCK_SIZE: usize = 512;

/// Length of the standard all-zero end-of-archive terminator (two blocks).
pub const END_OF_ARCHIVE_LEN: usize = 1024;

/// Magic string for UStar format headers ("ustar\0").
pub const MAGIC: &[u8; 6] = b"ustar\0";

/// Version field for UStar format headers ("00").
pub const VERSION: &[u8; 2] = b"00";

/// Sentinel chksum value meaning "compute the checksum at write time".
pub const CHECKSUM_SENTINEL: &[u8; 8] = b"docheck\0";

/// Extension given to generated entry names so that files an extractor
/// leaves behind can be swept up after a campaign.
pub const ARTIFACT_EXT: &str = ".txt";

/// The eleven defined typeflag bytes: regular ('0'), old-style regular
/// (NUL), hard link ('1'), symlink ('2'), character device ('3'), block
/// device ('4'), directory ('5'), FIFO ('6'), contiguous ('7'), extended
/// header ('x'), and global extended header ('g').
pub const TYPEFLAGS: [u8; 11] = [
    b'0', b'\0', b'1', b'2', b'3', b'4', b'5', b'6', b'7', b'x', b'g',
];

/// The twelve mode bits: setuid, setgid, sticky, then owner/group/other
/// read-write-execute.
pub const MODE_BITS: [u32; 12] = [
    0o4000, 0o2000, 0o1000, 0o400, 0o200, 0o100, 0o040, 0o020, 0o010, 0o004, 0o002, 0o001,
];

/// The mutable fields of a [`HeaderRecord`], with their canonical offsets
/// and widths. The reserved `prefix`/`pad` regions are not enumerated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Mode,
    Uid,
    Gid,
    Size,
    Mtime,
    Chksum,
    Typeflag,
    Linkname,
    Magic,
    Version,
    Uname,
    Gname,
    DevMajor,
    DevMinor,
}

impl Field {
    /// All fields, in header order.
    pub const ALL: [Field; 15] = [
        Field::Name,
        Field::Mode,
        Field::Uid,
        Field::Gid,
        Field::Size,
        Field::Mtime,
        Field::Chksum,
        Field::Typeflag,
        Field::Linkname,
        Field::Magic,
        Field::Version,
        Field::Uname,
        Field::Gname,
        Field::DevMajor,
        Field::DevMinor,
    ];

    /// Byte offset of the field within the 512-byte block.
    #[must_use]
    pub const fn offset(self) -> usize {
        match self {
            Field::Name => 0,
            Field::Mode => 100,
            Field::Uid => 108,
            Field::Gid => 116,
            Field::Size => 124,
            Field::Mtime => 136,
            Field::Chksum => 148,
            Field::Typeflag => 156,
            Field::Linkname => 157,
            Field::Magic => 257,
            Field::Version => 263,
            Field::Uname => 265,
            Field::Gname => 297,
            Field::DevMajor => 329,
            Field::DevMinor => 337,
        }
    }

    /// Width of the field in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Field::Name | Field::Linkname => 100,
            Field::Mode
            | Field::Uid
            | Field::Gid
            | Field::Chksum
            | Field::DevMajor
            | Field::DevMinor => 8,
            Field::Size | Field::Mtime => 12,
            Field::Typeflag => 1,
            Field::Magic => 6,
            Field::Version => 2,
            Field::Uname | Field::Gname => 32,
        }
    }

    /// The byte range the field occupies.
    #[must_use]
    pub fn range(self) -> Range<usize> {
        self.offset()..self.offset() + self.width()
    }

    /// Display name, used to build test labels and crash file names.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Field::Name => "name",
            Field::Mode => "mode",
            Field::Uid => "uid",
            Field::Gid => "gid",
            Field::Size => "size",
            Field::Mtime => "mtime",
            Field::Chksum => "chksum",
            Field::Typeflag => "typeflag",
            Field::Linkname => "linkname",
            Field::Magic => "magic",
            Field::Version => "version",
            Field::Uname => "uname",
            Field::Gname => "gname",
            Field::DevMajor => "devmajor",
            Field::DevMinor => "devminor",
        }
    }
}

/// The fixed 512-byte UStar header block, with one named region per field.
///
/// Unlike a parsing-oriented header type, every field is public and raw:
/// tests reach into individual fields and rewrite them with boundary
/// values, and the record is serialized exactly as it stands (modulo the
/// checksum sentinel protocol, see the module docs).
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
#[repr(C)]
pub struct HeaderRecord {
    /// Entry path name.
    pub name: [u8; 100],
    /// File mode in octal ASCII.
    pub mode: [u8; 8],
    /// Owner user ID in octal ASCII.
    pub uid: [u8; 8],
    /// Owner group ID in octal ASCII.
    pub gid: [u8; 8],
    /// Content size in octal ASCII.
    pub size: [u8; 12],
    /// Modification time (Unix epoch) in octal ASCII.
    pub mtime: [u8; 12],
    /// Header checksum, or [`CHECKSUM_SENTINEL`].
    pub chksum: [u8; 8],
    /// Entry type flag.
    pub typeflag: u8,
    /// Link target for hard/symbolic links.
    pub linkname: [u8; 100],
    /// Format magic ("ustar\0").
    pub magic: [u8; 6],
    /// Format version ("00").
    pub version: [u8; 2],
    /// Owner user name.
    pub uname: [u8; 32],
    /// Owner group name.
    pub gname: [u8; 32],
    /// Device major number in octal ASCII.
    pub devmajor: [u8; 8],
    /// Device minor number in octal ASCII.
    pub devminor: [u8; 8],
    /// Reserved path prefix region, kept zero.
    pub prefix: [u8; 155],
    /// Padding to fill the 512-byte block.
    pub pad: [u8; 12],
}

impl Default for HeaderRecord {
    fn default() -> Self {
        Self {
            name: [0u8; 100],
            mode: [0u8; 8],
            uid: [0u8; 8],
            gid: [0u8; 8],
            size: [0u8; 12],
            mtime: [0u8; 12],
            chksum: [0u8; 8],
            typeflag: 0,
            linkname: [0u8; 100],
            magic: [0u8; 6],
            version: [0u8; 2],
            uname: [0u8; 32],
            gname: [0u8; 32],
            devmajor: [0u8; 8],
            devminor: [0u8; 8],
            prefix: [0u8; 155],
            pad: [0u8; 12],
        }
    }
}

impl HeaderRecord {
    /// Build the minimal valid regular-file header every test perturbs from.
    ///
    /// The name carries a random 6-digit serial so that repeated campaigns
    /// (and the files an extractor creates from them) don't collide, plus
    /// the [`ARTIFACT_EXT`] suffix so cleanup can find those files later.
    /// The chksum field is set to the sentinel.
    #[must_use]
    pub fn baseline() -> Self {
        let mut header = Self::default();
        let serial: u32 = rand::rng().random_range(0..1_000_000);
        header.set_field_str(Field::Name, &format!("name_{serial:06}{ARTIFACT_EXT}"));
        header.set_field_str(Field::Mode, "0000777");
        header.set_field_str(Field::Uid, "0001000");
        header.set_field_str(Field::Gid, "0001000");
        header.set_size(0);
        header.set_field_str(Field::Mtime, "0");
        header.chksum.copy_from_slice(CHECKSUM_SENTINEL);
        header.typeflag = b'0';
        header.magic.copy_from_slice(MAGIC);
        header.version.copy_from_slice(VERSION);
        header.set_field_str(Field::Uname, "user");
        header.set_field_str(Field::Gname, "user");
        header.set_field_str(Field::DevMajor, "0000000");
        header.set_field_str(Field::DevMinor, "0000000");
        header
    }

    /// View the record as its raw 512 bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        zerocopy::transmute_ref!(self)
    }

    /// Mutable view of the raw 512 bytes.
    pub fn as_mut_bytes(&mut self) -> &mut [u8; BLOCK_SIZE] {
        zerocopy::transmute_mut!(self)
    }

    /// Borrow a field region by tag.
    #[must_use]
    pub fn field(&self, field: Field) -> &[u8] {
        &self.as_bytes()[field.range()]
    }

    /// Mutably borrow a field region by tag.
    pub fn field_mut(&mut self, field: Field) -> &mut [u8] {
        let range = field.range();
        &mut self.as_mut_bytes()[range]
    }

    /// Zero-fill a field, then copy `value` into it, truncating at the
    /// field width.
    pub fn set_field_str(&mut self, field: Field, value: &str) {
        let dest = self.field_mut(field);
        dest.fill(0);
        let n = value.len().min(dest.len());
        dest[..n].copy_from_slice(&value.as_bytes()[..n]);
    }

    /// Encode `size` into the size field as 11 zero-padded octal digits
    /// plus a trailing NUL.
    ///
    /// There is deliberately no range check. Negative values are pinned to
    /// their 32-bit two's-complement bit pattern before formatting, so
    /// `-2` encodes as `37777777776` — an out-of-range octal string that
    /// the extractor under test has to cope with.
    pub fn set_size(&mut self, size: i64) {
        let value = if size < 0 {
            u64::from(size as u32)
        } else {
            size as u64
        };
        let digits = format!("{value:011o}");
        self.size.fill(0);
        let n = digits.len().min(self.size.len() - 1);
        self.size[..n].copy_from_slice(&digits.as_bytes()[..n]);
    }

    /// Whether the chksum field holds the sentinel.
    #[must_use]
    pub fn needs_checksum(&self) -> bool {
        &self.chksum == CHECKSUM_SENTINEL
    }

    /// Compute the checksum and encode it into the chksum field.
    ///
    /// The checksum is the unsigned sum of all 512 bytes with the chksum
    /// field counted as eight spaces, encoded as 6 zero-padded octal
    /// digits followed by a NUL at byte 6 and a space at byte 7. The
    /// maximum possible sum (512 × 255) fits in 6 octal digits.
    pub fn fill_checksum(&mut self) -> u32 {
        self.chksum.fill(b' ');
        let sum: u32 = self.as_bytes().iter().map(|&b| u32::from(b)).sum();
        let digits = format!("{sum:06o}");
        self.chksum[..6].copy_from_slice(&digits.as_bytes()[..6]);
        self.chksum[6] = 0;
        self.chksum[7] = b' ';
        sum
    }
}

impl fmt::Debug for HeaderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeaderRecord")
            .field("name", &String::from_utf8_lossy(truncate_null(&self.name)))
            .field("size", &String::from_utf8_lossy(truncate_null(&self.size)))
            .field("typeflag", &self.typeflag)
            .field("needs_checksum", &self.needs_checksum())
            .finish_non_exhaustive()
    }
}

/// Truncate a byte slice at the first NUL byte.
#[must_use]
pub fn truncate_null(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(pos) => &bytes[..pos],
        None => bytes,
    }
}
