use std::fs;
use std::path::{Path, PathBuf};

use predicates::function::FnPredicate;
use predicates::prelude::predicate;

/// Splits each argument on whitespace, so options and their values can be given together.
pub fn prepare_args(args: Vec<&str>) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Prints the output of the command, always succeeds.
pub fn print(label: &'static str) -> FnPredicate<impl Fn(&[u8]) -> bool, [u8]> {
    predicate::function(move |content: &[u8]| {
        println!("{}:\n{}", label, String::from_utf8_lossy(content));
        true
    })
}

pub fn write_file(directory: &Path, relative_path: &str, content: &str) -> PathBuf {
    let path = directory.join(relative_path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
}
