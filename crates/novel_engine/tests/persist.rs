use std::fs;

use novel_engine::{ensure_output_dir, AtomicFileWriter, PersistError};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

#[test]
fn library_dir_is_created_with_parents() {
    let temp = TempDir::new().unwrap();
    let library = temp.path().join("books").join("library");
    ensure_output_dir(&library).unwrap();
    assert!(library.is_dir());
    // Existing directories are accepted as they are.
    ensure_output_dir(&library).unwrap();
}

#[test]
fn a_file_where_the_library_should_be_is_rejected() {
    let temp = TempDir::new().unwrap();
    let blocker = temp.path().join("library");
    fs::write(&blocker, "x").unwrap();

    let err = ensure_output_dir(&blocker).unwrap_err();
    assert!(matches!(err, PersistError::OutputDir { ref path, .. } if *path == blocker));
}

#[test]
fn rewriting_a_chapter_replaces_it() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());

    let first = writer.write("7/00001.md", "draft").unwrap();
    assert_eq!(first, temp.path().join("7").join("00001.md"));
    let second = writer.write("7/00001.md", "final").unwrap();
    assert_eq!(first, second);

    assert_eq!(writer.read("7/00001.md").unwrap().as_deref(), Some("final"));
    let leftovers: Vec<_> = fs::read_dir(temp.path().join("7"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec!["00001.md"]);
}

#[test]
fn missing_files_read_as_none() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().to_path_buf());
    assert_eq!(writer.read("3/00009.md").unwrap(), None);
    assert!(!writer.exists("3/00009.md"));
}

#[test]
fn paths_outside_the_library_are_refused() {
    let temp = TempDir::new().unwrap();
    let writer = AtomicFileWriter::new(temp.path().join("library"));

    assert!(matches!(
        writer.write("../escape.md", "x"),
        Err(PersistError::OutsideRoot(_))
    ));
    assert!(matches!(
        writer.path_for("/etc/passwd"),
        Err(PersistError::OutsideRoot(_))
    ));
    assert!(!writer.exists("../escape.md"));
    assert!(!temp.path().join("escape.md").exists());
}

#[test]
fn failed_write_leaves_nothing_behind() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("library");
    fs::write(&not_a_dir, "x").unwrap();

    let writer = AtomicFileWriter::new(not_a_dir.clone());
    assert!(writer.write("1/00001.md", "data").is_err());
    assert_eq!(fs::read_to_string(&not_a_dir).unwrap(), "x");
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
}
