//! Module locating the flight files to enrich and where their enriched copies go

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

use tracing::debug;
use walkdir::WalkDir;

use crate::Error;

const INPUT_EXTENSION: &str = "csv";

/// A flight file together with its place below the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
    relative: PathBuf,
}

impl InputFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the enriched file, relative to the output directory.
    ///
    /// Files given explicitly keep their file name. Files found in a directory keep their path
    /// below that directory, so nested inputs are mirrored under the output directory.
    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn output_path(&self, output_dir: &Path) -> PathBuf {
        output_dir.join(&self.relative)
    }
}

/// Expands `inputs` into the list of CSV files to process.
///
/// Files are taken as given. Directories contribute the `.csv` files they contain, descending
/// into sub-directories only if `recursive` is set. The result is sorted and free of duplicates.
/// Two different files that would land on the same output path are an error.
pub fn discover_inputs(inputs: &[PathBuf], recursive: bool) -> Result<Vec<InputFile>, Error> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        if input.is_file() {
            let relative = input
                .file_name()
                .map_or_else(|| input.clone(), PathBuf::from);
            if seen.insert(input.clone()) {
                files.push(InputFile {
                    path: input.clone(),
                    relative,
                });
            }
        } else if input.is_dir() {
            let max_depth = if recursive { usize::MAX } else { 1 };
            for entry in WalkDir::new(input).max_depth(max_depth) {
                let entry = entry?;
                if !entry.file_type().is_file() || !is_csv(entry.path()) {
                    continue;
                }
                let path = entry.into_path();
                let relative = match path.strip_prefix(input) {
                    Ok(relative) => relative.to_path_buf(),
                    Err(_) => path.file_name().map_or_else(|| path.clone(), PathBuf::from),
                };
                if seen.insert(path.clone()) {
                    files.push(InputFile { path, relative });
                }
            }
        } else {
            return Err(Error::InputNotFound(input.clone()));
        }
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    check_collisions(&files)?;
    debug!(count = files.len(), "input files discovered");
    Ok(files)
}

fn check_collisions(files: &[InputFile]) -> Result<(), Error> {
    let mut targets: HashMap<&Path, &Path> = HashMap::new();
    for file in files {
        if let Some(first) = targets.insert(&file.relative, &file.path) {
            return Err(Error::OutputCollision {
                relative: file.relative.clone(),
                first: first.to_path_buf(),
                second: file.path.clone(),
            });
        }
    }
    Ok(())
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(INPUT_EXTENSION))
}
