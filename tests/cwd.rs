//! Working Directory Contract
//!
//! Kept in its own test binary: it removes the process's current directory.

#![cfg(unix)]

use std::env;
use std::fs;
use std::path::Path;

use ecsdeploy_core::{PipelineError, SourceLocator};

#[test]
fn invariant_unreadable_cwd_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    fs::create_dir_all(&src).unwrap();
    fs::write(src.join("Foo.sol"), "// contract").unwrap();

    let doomed = dir.path().join("cwd");
    fs::create_dir(&doomed).unwrap();
    env::set_current_dir(&doomed).unwrap();
    fs::remove_dir(&doomed).unwrap();

    // A relative output dir needs the current directory to anchor it
    let names = vec!["Foo".to_string()];
    let result = SourceLocator::default().locate(&names, &src, Path::new("out"));

    env::set_current_dir(dir.path()).unwrap();
    assert!(matches!(result, Err(PipelineError::SourceRoot(_))));

    // Absolute inputs never consult it
    let map = SourceLocator::default().locate(&names, &src, &dir.path().join("out")).unwrap();
    assert_eq!(map["Foo"], "../src/Foo.sol");
}
