//! One extractor run: spawn, classify, persist crashes.

use std::fs;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::debug;
use thiserror::Error;

use crate::report::{GREEN, RESET};

/// The exact first line a crashing extractor prints.
pub const CRASH_SIGNATURE: &[u8] = b"*** The program has crashed ***\n";

/// Name of the reusable working archive file.
pub const WORK_FILE: &str = "test.tar";

/// A failure of the harness machinery itself, distinct from the three
/// statistical outcomes an extractor run can produce.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to run extractor {}: {source}", path.display())]
    Spawn { path: PathBuf, source: io::Error },
    #[error("pipe error: {0}")]
    Pipe(#[from] io::Error),
    #[error("failed to persist crash archive as {}: {source}", path.display())]
    Persist { path: PathBuf, source: io::Error },
}

/// Classification of one extractor run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The extractor produced no output at all.
    NoOutput,
    /// The extractor produced output other than the crash signature,
    /// presumably an error message rejecting the archive.
    Rejected,
    /// The first output line matched [`CRASH_SIGNATURE`] exactly.
    Crashed,
}

/// Running tallies of the three outcomes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub crashes: u32,
    pub rejected: u32,
    pub no_output: u32,
}

impl Stats {
    /// Total number of classified runs.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.crashes + self.rejected + self.no_output
    }
}

/// Invokes the extractor under test against the working archive file.
#[derive(Debug)]
pub struct Harness {
    extractor: PathBuf,
    workdir: PathBuf,
    archive: PathBuf,
}

impl Harness {
    pub fn new(extractor: PathBuf, workdir: PathBuf) -> Self {
        let archive = workdir.join(WORK_FILE);
        Self {
            extractor,
            workdir,
            archive,
        }
    }

    /// Path of the working archive file the next run will read.
    #[must_use]
    pub fn archive_path(&self) -> &Path {
        &self.archive
    }

    /// Run the extractor once against the working archive and classify
    /// the result under `label`, updating `stats`.
    ///
    /// stdout and stderr are merged into a single pipe and only the
    /// first line is read, bounded to the signature length. The read
    /// blocks until the extractor writes or exits; there is no timeout,
    /// so a hanging silent extractor stalls the campaign.
    ///
    /// On a crash the working archive is renamed to
    /// `success_<count>_<label>.tar` so the triggering input survives
    /// both the next test and the end-of-campaign cleanup.
    pub fn run_one(&self, stats: &mut Stats, label: &str) -> Result<Outcome, HarnessError> {
        let (reader, writer) = io::pipe()?;
        let stderr_writer = writer.try_clone()?;
        let mut child = Command::new(&self.extractor)
            .arg(WORK_FILE)
            .stdin(Stdio::null())
            .stdout(writer)
            .stderr(stderr_writer)
            .current_dir(&self.workdir)
            .spawn()
            .map_err(|source| HarnessError::Spawn {
                path: self.extractor.clone(),
                source,
            })?;

        let mut first_line = Vec::new();
        let mut reader = BufReader::new(reader).take(CRASH_SIGNATURE.len() as u64);
        reader.read_until(b'\n', &mut first_line)?;
        // Close our read end before waiting. A chatty extractor that has
        // filled the pipe gets EPIPE/SIGPIPE on its next write instead of
        // blocking forever against a reader that has stopped reading.
        drop(reader);
        let status = child.wait()?;
        debug!("{label}: extractor exited with {status}");

        let outcome = if first_line.is_empty() {
            stats.no_output += 1;
            Outcome::NoOutput
        } else if first_line != CRASH_SIGNATURE {
            stats.rejected += 1;
            Outcome::Rejected
        } else {
            stats.crashes += 1;
            let kept = self
                .workdir
                .join(format!("success_{:03}_{label}.tar", stats.crashes));
            fs::rename(&self.archive, &kept).map_err(|source| HarnessError::Persist {
                path: kept.clone(),
                source,
            })?;
            println!("{GREEN}Crash message n°{}{RESET} -> {label}", stats.crashes);
            Outcome::Crashed
        };
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn stub_extractor(dir: &Path, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("extractor.sh");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh").unwrap();
        writeln!(file, "{script}").unwrap();
        file.set_permissions(fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn harness_with(script: &str) -> (tempfile::TempDir, Harness) {
        let dir = tempfile::tempdir().unwrap();
        let extractor = stub_extractor(dir.path(), script);
        let harness = Harness::new(extractor, dir.path().to_path_buf());
        fs::write(harness.archive_path(), b"not a real archive").unwrap();
        (dir, harness)
    }

    #[test]
    fn test_silent_extractor_counts_no_output() {
        let (_dir, harness) = harness_with("exit 0");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "case").unwrap();
        assert_eq!(outcome, Outcome::NoOutput);
        assert_eq!(stats, Stats { no_output: 1, ..Stats::default() });
    }

    #[test]
    fn test_error_output_counts_rejected() {
        let (_dir, harness) = harness_with("echo 'bad archive'");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "case").unwrap();
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.crashes, 0);
    }

    #[test]
    fn test_stderr_is_merged_into_classification() {
        let (_dir, harness) = harness_with("echo 'oops' >&2");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "case").unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[test]
    fn test_crash_signature_persists_archive() {
        let (dir, harness) = harness_with("printf '*** The program has crashed ***\\n'");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "size_0").unwrap();
        assert_eq!(outcome, Outcome::Crashed);
        assert_eq!(stats.crashes, 1);
        assert!(dir.path().join("success_001_size_0.tar").exists());
        assert!(!harness.archive_path().exists());
    }

    #[test]
    fn test_crash_count_numbers_persisted_archives() {
        let (dir, harness) = harness_with("printf '*** The program has crashed ***\\n'");
        let mut stats = Stats::default();
        harness.run_one(&mut stats, "first").unwrap();
        fs::write(harness.archive_path(), b"next input").unwrap();
        harness.run_one(&mut stats, "second").unwrap();
        assert_eq!(stats.crashes, 2);
        assert!(dir.path().join("success_001_first.tar").exists());
        assert!(dir.path().join("success_002_second.tar").exists());
    }

    #[test]
    fn test_forbidden_slash_crash_archive_is_persisted() {
        use crate::mutation::Mutation;

        let (dir, harness) = harness_with("printf '*** The program has crashed ***\\n'");
        let mut stats = Stats::default();
        let label = format!("name_{}", Mutation::ForbiddenChar(b'/').label());
        let outcome = harness.run_one(&mut stats, &label).unwrap();
        assert_eq!(outcome, Outcome::Crashed);
        assert!(dir.path().join(format!("success_001_{label}.tar")).exists());
    }

    #[test]
    fn test_partial_signature_is_rejected_not_crash() {
        let (_dir, harness) = harness_with("printf '*** The program has cra'");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "case").unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[test]
    fn test_chatty_extractor_does_not_deadlock() {
        // Write far more than a pipe buffer holds; the harness reads one
        // line, drops the pipe, and must still reach wait().
        let (_dir, harness) =
            harness_with("i=0; while [ $i -lt 20000 ]; do echo 'error line'; i=$((i+1)); done");
        let mut stats = Stats::default();
        let outcome = harness.run_one(&mut stats, "case").unwrap();
        assert_eq!(outcome, Outcome::Rejected);
    }

    #[test]
    fn test_missing_extractor_is_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let harness = Harness::new(dir.path().join("no-such-extractor"), dir.path().to_path_buf());
        let mut stats = Stats::default();
        let err = harness.run_one(&mut stats, "case").unwrap_err();
        assert!(matches!(err, HarnessError::Spawn { .. }));
        assert!(err.to_string().contains("no-such-extractor"));
        assert_eq!(stats.total(), 0);
    }
}
