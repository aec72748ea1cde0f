#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub fn read_file(path: &str) -> String {
    fs::read_to_string(Path::new(path)).expect("Failed to read file")
}

pub fn sample_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("samples")
        .join(name)
}
