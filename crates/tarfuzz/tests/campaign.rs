//! Whole-campaign behavior against a stub extractor.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tarfuzz::campaign::Campaign;
use tarfuzz::harness::WORK_FILE;

fn silent_extractor(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("extractor.sh");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "exit 0").unwrap();
    file.set_permissions(fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[test]
fn campaign_is_idempotent_for_a_silent_extractor() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = silent_extractor(dir.path());

    let first = Campaign::new(extractor.clone(), dir.path().to_path_buf()).run();
    let second = Campaign::new(extractor, dir.path().to_path_buf()).run();

    assert_eq!(first, second);
    assert_eq!(first.crashes, 0);
    assert_eq!(first.rejected, 0);
    assert_eq!(first.no_output, first.total());
    assert!(first.total() > 0);

    // Cleanup leaves neither the working archive nor any artifacts.
    assert!(!dir.path().join(WORK_FILE).exists());
    let leftovers: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.ends_with(".txt"))
        .collect();
    assert_eq!(leftovers, Vec::<String>::new());
}

fn crashing_extractor(dir: &Path) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("crasher.sh");
    let mut file = fs::File::create(&path).unwrap();
    writeln!(file, "#!/bin/sh").unwrap();
    writeln!(file, "printf '*** The program has crashed ***\\n'").unwrap();
    file.set_permissions(fs::Permissions::from_mode(0o755)).unwrap();
    // The handle must be closed before the script is spawned, or every
    // spawn fails with ETXTBSY.
    drop(file);
    path
}

#[test]
fn campaign_persists_crash_archives_across_cleanup() {
    let dir = tempfile::tempdir().unwrap();
    let extractor = crashing_extractor(dir.path());

    let stats = Campaign::new(extractor, dir.path().to_path_buf()).run();
    assert!(stats.total() > 0);
    assert_eq!(stats.crashes, stats.total());

    let kept = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.starts_with("success_") && name.ends_with(".tar"))
        .count();
    assert_eq!(kept as u32, stats.crashes);
}
