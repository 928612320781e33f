//! File-writing primitives for assembled archives.
//!
//! Two write paths exist on purpose. [`write_archive`] gives single-entry
//! tests byte-exact control over the terminator (and writes content without
//! block alignment, so declared-size mismatches stay visible at the archive
//! boundary). [`write_entries`] is the standard block-aligned path used by
//! multi-entry tests, where terminator anomalies must *not* be part of the
//! variable under test.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::debug;

use crate::{HeaderRecord, BLOCK_SIZE, END_OF_ARCHIVE_LEN};

const ZEROES: [u8; END_OF_ARCHIVE_LEN] = [0u8; END_OF_ARCHIVE_LEN];

/// One archive entry: a header plus the content it exclusively owns.
///
/// Entries are consumed by [`write_entries`]; ownership of the content
/// buffer moves into the writer, so an entry cannot be reused after it has
/// been serialized.
#[derive(Debug)]
pub struct Entry {
    /// The entry's header. Its size field is overwritten from the content
    /// length at write time.
    pub header: HeaderRecord,
    /// The entry's content.
    pub content: Vec<u8>,
}

impl Entry {
    /// Create an entry from a header and its content.
    #[must_use]
    pub fn new(header: HeaderRecord, content: Vec<u8>) -> Self {
        Self { header, content }
    }
}

/// Resolve the checksum sentinel on a copy, leaving `header` untouched.
fn resolved(header: &HeaderRecord) -> HeaderRecord {
    let mut copy = *header;
    if copy.needs_checksum() {
        copy.fill_checksum();
    }
    copy
}

/// Serialize `header`, `content`, and exactly the given terminator bytes
/// to `path`, truncating any existing file.
///
/// The content is written verbatim with no padding to a block boundary.
/// A header whose chksum field holds the sentinel gets its real checksum
/// in the serialized copy only.
pub fn write_archive(
    path: impl AsRef<Path>,
    header: &HeaderRecord,
    content: &[u8],
    terminator: &[u8],
) -> io::Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    out.write_all(resolved(header).as_bytes())?;
    out.write_all(content)?;
    out.write_all(terminator)?;
    out.flush()?;
    debug!(
        "wrote {}: {} content bytes, {} terminator bytes",
        path.display(),
        content.len(),
        terminator.len()
    );
    Ok(())
}

/// [`write_archive`] with the standard 1024-byte zero terminator.
pub fn write_simple(
    path: impl AsRef<Path>,
    header: &HeaderRecord,
    content: &[u8],
) -> io::Result<()> {
    write_archive(path, header, content, &ZEROES)
}

/// Serialize a batch of entries as one standard multi-entry archive.
///
/// For each entry in order: the size field is set from the content length,
/// the (checksum-resolved) header and content are written, then zero
/// padding up to the next 512-byte boundary. The padding length is
/// `512 - (len % 512)`, which is always 1..=512 bytes — content that is
/// already block-aligned gets a full block of padding. A 1024-byte zero
/// end-of-archive terminator follows the last entry.
pub fn write_entries(path: impl AsRef<Path>, entries: Vec<Entry>) -> io::Result<()> {
    let path = path.as_ref();
    let mut out = BufWriter::new(File::create(path)?);
    let count = entries.len();
    for mut entry in entries {
        entry.header.set_size(entry.content.len() as i64);
        out.write_all(resolved(&entry.header).as_bytes())?;
        out.write_all(&entry.content)?;
        let padding = BLOCK_SIZE - entry.content.len() % BLOCK_SIZE;
        out.write_all(&ZEROES[..padding])?;
    }
    out.write_all(&ZEROES)?;
    out.flush()?;
    debug!("wrote {}: {count} entries", path.display());
    Ok(())
}
