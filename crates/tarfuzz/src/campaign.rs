//! The campaign orchestrator.
//!
//! Runs every field battery and archive-level scenario in a fixed order,
//! then cleans up the artifacts the extractor left behind and prints the
//! summary. Each field sequence starts from a fresh baseline header, so
//! one field's mutations never leak into another field's tests; within a
//! sequence the header is shared and progressively mutated, which is why
//! mutation order is significant.

use std::fs;
use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use log::{error, warn};
use tar_record::writer::{self, Entry};
use tar_record::{
    Field, HeaderRecord, ARTIFACT_EXT, END_OF_ARCHIVE_LEN, MODE_BITS, TYPEFLAGS,
};

use crate::harness::{Harness, Stats, WORK_FILE};
use crate::mutation::Mutation;
use crate::report;

/// Fixed content for tests that need a payload smaller than a block.
const PAYLOAD: &[u8] = b"hello";

/// A full fuzzing campaign against one extractor.
pub struct Campaign {
    harness: Harness,
    workdir: PathBuf,
    stats: Stats,
}

impl Campaign {
    pub fn new(extractor: PathBuf, workdir: PathBuf) -> Self {
        Self {
            harness: Harness::new(extractor, workdir.clone()),
            workdir,
            stats: Stats::default(),
        }
    }

    /// Run the whole campaign and return the final tallies.
    pub fn run(mut self) -> Stats {
        println!("Begin fuzzing...");
        let start = Instant::now();

        self.name_field(Field::Name);
        self.mode_field();
        self.generic_field(Field::Uid);
        self.generic_field(Field::Gid);
        self.size_field();
        self.mtime_field();
        self.generic_field(Field::Chksum);
        self.typeflag_field();
        self.name_field(Field::Linkname);
        self.generic_field(Field::Magic);
        self.version_field();
        self.generic_field(Field::Uname);
        self.generic_field(Field::Gname);
        self.generic_field(Field::DevMajor);
        self.generic_field(Field::DevMinor);
        self.end_bytes();
        self.archives();

        let elapsed = start.elapsed();
        println!("Cleaning extractor results...");
        self.cleanup();
        report::print_summary(&self.stats, elapsed);
        self.stats
    }

    /// Run the extractor against whatever the working archive currently
    /// holds, folding harness-level failures into the log rather than
    /// aborting the campaign.
    fn run_case(&mut self, label: &str) {
        if let Err(err) = self.harness.run_one(&mut self.stats, label) {
            error!("{label}: {err}");
        }
    }

    /// Write a single-header archive with the standard terminator, then
    /// run one test. A failed write is logged and the test still runs
    /// against the stale file state.
    fn simple_case(&mut self, header: &HeaderRecord, content: &[u8], label: &str) {
        if let Err(err) = writer::write_simple(self.harness.archive_path(), header, content) {
            warn!("{label}: could not write archive, testing stale state: {err}");
        }
        self.run_case(label);
    }

    /// Like [`Campaign::simple_case`] with explicit terminator bytes.
    fn archive_case(
        &mut self,
        header: &HeaderRecord,
        content: &[u8],
        terminator: &[u8],
        label: &str,
    ) {
        if let Err(err) =
            writer::write_archive(self.harness.archive_path(), header, content, terminator)
        {
            warn!("{label}: could not write archive, testing stale state: {err}");
        }
        self.run_case(label);
    }

    /// Write a block-aligned multi-entry archive, then run one test.
    fn entries_case(&mut self, entries: Vec<Entry>, label: &str) {
        if let Err(err) = writer::write_entries(self.harness.archive_path(), entries) {
            warn!("{label}: could not write archive, testing stale state: {err}");
        }
        self.run_case(label);
    }

    /// The ten-mutation generic battery against one field, sharing one
    /// progressively mutated header.
    fn generic_field(&mut self, field: Field) {
        let mut header = HeaderRecord::baseline();
        for mutation in Mutation::GENERIC {
            mutation.apply(header.field_mut(field));
            self.simple_case(&header, b"", &format!("{}_{}", field.name(), mutation.label()));
        }
    }

    /// The name-shaped battery, used for both name and linkname: the
    /// generic battery plus the path-specific mutations and the two
    /// first-byte character sweeps. The linkname sequence additionally
    /// opens with linkname set to the same bytes as the name.
    fn name_field(&mut self, field: Field) {
        let mut header = HeaderRecord::baseline();
        if field == Field::Linkname {
            let name = header.name;
            header.linkname.copy_from_slice(&name);
            self.simple_case(&header, b"", "linkname_same_as_name");
        }
        let mutations = Mutation::GENERIC
            .into_iter()
            .chain([Mutation::FillAll, Mutation::Directory])
            .chain(Mutation::weird_chars())
            .chain(Mutation::forbidden_chars());
        for mutation in mutations {
            mutation.apply(header.field_mut(field));
            self.simple_case(&header, b"", &format!("{}_{}", field.name(), mutation.label()));
        }
    }

    /// Generic battery on the mode field, then each permission and
    /// special bit on its own as a 7-digit octal string.
    fn mode_field(&mut self) {
        self.generic_field(Field::Mode);
        for bits in MODE_BITS {
            let mut header = HeaderRecord::baseline();
            let text = format!("{bits:07o}");
            header.set_field_str(Field::Mode, &text);
            self.simple_case(&header, b"", &format!("mode='{text}'"));
        }
    }

    /// Generic battery on the size field, then declared-size edge cases
    /// against a fixed 5-byte payload. The payload is always written in
    /// full; the declared size is the variable under test.
    fn size_field(&mut self) {
        self.generic_field(Field::Size);
        let cases: [(&str, i64); 5] = [
            ("0", 0),
            ("too_small", 2),
            ("too_big", 20),
            ("far_too_big", (END_OF_ARCHIVE_LEN * 2) as i64),
            ("negative", -2),
        ];
        for (name, size) in cases {
            let mut header = HeaderRecord::baseline();
            header.set_size(size);
            self.simple_case(&header, PAYLOAD, &format!("size_{name}"));
        }
    }

    /// Generic battery on the mtime field, then four wall-clock-derived
    /// timestamps formatted as plain octal.
    fn mtime_field(&mut self) {
        self.generic_field(Field::Mtime);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs());
        let cases = [
            ("current", now),
            ("later", now + 50 * 3600),
            ("sooner", now.saturating_sub(50 * 3600)),
            ("far_future", now * 2),
        ];
        for (name, seconds) in cases {
            let mut header = HeaderRecord::baseline();
            header.set_field_str(Field::Mtime, &format!("{seconds:o}"));
            self.simple_case(&header, b"", &format!("mtime_{name}"));
        }
    }

    /// Every defined typeflag byte, one run each.
    fn typeflag_field(&mut self) {
        let mut header = HeaderRecord::baseline();
        for flag in TYPEFLAGS {
            header.typeflag = flag;
            let label = if flag.is_ascii_graphic() {
                format!("typeflag_value='{}'", flag as char)
            } else {
                format!("typeflag_value=0x{flag:02x}")
            };
            self.simple_case(&header, b"", &label);
        }
    }

    /// Generic battery on the version field, then all 64 octal digit
    /// pairs in row-major order.
    fn version_field(&mut self) {
        self.generic_field(Field::Version);
        let mut header = HeaderRecord::baseline();
        for i in 0..64u8 {
            let hi = b'0' + i / 8;
            let lo = b'0' + i % 8;
            header.version = [hi, lo];
            self.simple_case(
                &header,
                b"",
                &format!("version='{}{}'", hi as char, lo as char),
            );
        }
    }

    /// Terminator lengths from twice the standard down to nothing, each
    /// with and without the payload. The declared size stays at the
    /// payload length in both variants.
    fn end_bytes(&mut self) {
        let terminator = [0u8; END_OF_ARCHIVE_LEN * 2];
        let mut header = HeaderRecord::baseline();
        header.set_size(PAYLOAD.len() as i64);
        for length in [END_OF_ARCHIVE_LEN * 2, END_OF_ARCHIVE_LEN, 512, 1, 0] {
            self.archive_case(
                &header,
                PAYLOAD,
                &terminator[..length],
                &format!("end_bytes({length})_with_file"),
            );
            self.archive_case(
                &header,
                b"",
                &terminator[..length],
                &format!("end_bytes({length})_w-o_file"),
            );
        }
    }

    /// Archive-level scenarios: entry counts, name collisions, a
    /// directory entry with file content, a zero-byte archive, a large
    /// payload, and an all-zero header written verbatim.
    fn archives(&mut self) {
        let entries = (0..50)
            .map(|i| {
                let mut header = HeaderRecord::baseline();
                header.set_field_str(
                    Field::Name,
                    &format!("this_is_the_file_number_{i}{ARTIFACT_EXT}"),
                );
                Entry::new(header, format!("file number {i}").into_bytes())
            })
            .collect();
        self.entries_case(entries, "50_files");

        let entries = (0..5)
            .map(|i| {
                let mut header = HeaderRecord::baseline();
                header.set_field_str(Field::Name, &format!("same_name{ARTIFACT_EXT}"));
                Entry::new(header, format!("file number {i}").into_bytes())
            })
            .collect();
        self.entries_case(entries, "files_same_name");

        let mut header = HeaderRecord::baseline();
        header.set_field_str(Field::Name, &format!("test{ARTIFACT_EXT}/"));
        header.typeflag = b'5';
        let content = b"content of the directory like if it was a file".to_vec();
        self.entries_case(vec![Entry::new(header, content)], "files_dir_with_data");

        match fs::File::create(self.harness.archive_path()) {
            Ok(_) => self.run_case("files_empty_tar"),
            Err(err) => error!("files_empty_tar: could not create empty archive: {err}"),
        }

        let header = HeaderRecord::baseline();
        self.entries_case(
            vec![Entry::new(header, vec![b'A'; 50_000_000])],
            "files_big_file",
        );

        // All-zero header, no magic, no checksum sentinel: written as-is.
        self.simple_case(&HeaderRecord::default(), PAYLOAD, "files_corrupted_header");
    }

    /// Remove the disposable artifacts the campaign and the extractor
    /// produced: anything carrying the artifact extension plus the
    /// working archive. Persisted `success_*.tar` crash files stay.
    fn cleanup(&self) {
        let entries = match fs::read_dir(&self.workdir) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("cleanup: could not list {}: {err}", self.workdir.display());
                return;
            }
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if !name.ends_with(ARTIFACT_EXT) && name != WORK_FILE {
                continue;
            }
            let path = entry.path();
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(err) = removed {
                warn!("cleanup: could not remove {name}: {err}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::Path;

    fn silent_extractor(dir: &Path) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("extractor.sh");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "exit 0").unwrap();
        file.set_permissions(fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn campaign() -> (tempfile::TempDir, Campaign) {
        let dir = tempfile::tempdir().unwrap();
        let extractor = silent_extractor(dir.path());
        let campaign = Campaign::new(extractor, dir.path().to_path_buf());
        (dir, campaign)
    }

    #[test]
    fn test_typeflag_sweep_is_eleven_runs() {
        let (_dir, mut campaign) = campaign();
        campaign.typeflag_field();
        assert_eq!(campaign.stats.total(), 11);
        assert_eq!(campaign.stats.no_output, 11);
    }

    #[test]
    fn test_version_sweep_is_sixty_four_runs_plus_battery() {
        let (_dir, mut campaign) = campaign();
        campaign.version_field();
        assert_eq!(campaign.stats.total(), 10 + 64);
    }

    #[test]
    fn test_name_battery_count() {
        // 10 generic + fill_all + directory + 161 weird + 6 forbidden.
        let (_dir, mut campaign) = campaign();
        campaign.name_field(Field::Name);
        assert_eq!(campaign.stats.total(), 179);
    }

    #[test]
    fn test_linkname_battery_adds_same_as_name() {
        let (_dir, mut campaign) = campaign();
        campaign.name_field(Field::Linkname);
        assert_eq!(campaign.stats.total(), 180);
    }

    #[test]
    fn test_mode_battery_count() {
        let (_dir, mut campaign) = campaign();
        campaign.mode_field();
        assert_eq!(campaign.stats.total(), 10 + 12);
    }

    #[test]
    fn test_end_bytes_count() {
        let (_dir, mut campaign) = campaign();
        campaign.end_bytes();
        assert_eq!(campaign.stats.total(), 10);
    }

    #[test]
    fn test_cleanup_keeps_crash_archives() {
        let (dir, campaign) = campaign();
        fs::write(dir.path().join("leftover.txt"), b"x").unwrap();
        fs::create_dir(dir.path().join("dir.txt")).unwrap();
        fs::write(dir.path().join(WORK_FILE), b"x").unwrap();
        fs::write(dir.path().join("success_001_size_0.tar"), b"x").unwrap();

        campaign.cleanup();

        assert!(!dir.path().join("leftover.txt").exists());
        assert!(!dir.path().join("dir.txt").exists());
        assert!(!dir.path().join(WORK_FILE).exists());
        assert!(dir.path().join("success_001_size_0.tar").exists());
    }
}
