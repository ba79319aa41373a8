//! Module implementing the persistent write-through cache of weather observations.
//!
//! The cache keeps every entry in memory and mirrors each new entry to an append-only, gzip
//! compressed file with one `key_value` line per entry. Every append is written as its own gzip
//! member, so the file stays readable up to the last completed append. A tail that does not
//! decode is cut off on load, before anything new is appended. [`Cache::export`] rewrites the
//! whole map into a single member.

mod key;

use std::{
    collections::HashMap,
    ffi::OsString,
    fs::{self, File, OpenOptions},
    io::{self, BufRead, BufReader, Read, Seek, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
};

use flate2::{Compression, bufread::GzDecoder, write::GzEncoder};
use tracing::{debug, info, warn};

use crate::error::{Error, cache_io_error};

pub use key::{CacheKey, round_to_hour};
pub(crate) use key::round_unix_to_hour;


const DELIMITER: char = '_';

/// Concurrency-safe key-value store with first-write-wins semantics.
///
/// A single mutex guards both the map and the backing file, so the check for an existing key,
/// the insertion, and the append to disk happen as one step.
#[derive(Debug)]
pub struct Cache {
    path: PathBuf,
    state: Mutex<CacheState>,
}

#[derive(Debug)]
struct CacheState {
    entries: HashMap<String, String>,
    file: File,
}

impl Cache {
    /// Opens the cache file at `path`, creating it if absent, and loads all well-formed lines.
    ///
    /// Lines that do not split into exactly two `_`-delimited fields are dropped. For duplicate
    /// keys the first occurrence is kept.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();
        let file = open_for_append(&path)?;

        let mut entries = HashMap::new();
        let size = file.metadata().map_err(|e| cache_io_error(&path, e))?.len();
        if size > 0 {
            let reader = File::open(&path).map_err(|e| cache_io_error(&path, e))?;
            let intact =
                read_entries(reader, &mut entries).map_err(|e| cache_io_error(&path, e))?;
            if intact < size {
                warn!(path = %path.display(), intact, size, "cutting the unreadable tail off the cache file");
                truncate(&path, intact)?;
            }
        }
        info!(path = %path.display(), entries = entries.len(), "weather cache loaded");

        Ok(Self {
            path,
            state: Mutex::new(CacheState { entries, file }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point lookup in memory; never touches the disk.
    pub fn get(&self, key: &str) -> Option<String> {
        self.lock().entries.get(key).cloned()
    }

    /// Stores `value` under `key` unless the key is already present.
    ///
    /// Returns `Ok(true)` if this call inserted the entry and `Ok(false)` if another value was
    /// already stored. If the append to the backing file fails, the entry stays in memory for the
    /// lifetime of the process and the I/O error is returned.
    pub fn set(&self, key: &str, value: &str) -> Result<bool, Error> {
        validate_entry(key, value)?;

        let mut state = self.lock();
        if state.entries.contains_key(key) {
            debug!(key, "cache entry already present, keeping the first value");
            return Ok(false);
        }
        state.entries.insert(key.to_string(), value.to_string());

        append_line(&mut state.file, key, value).map_err(|e| cache_io_error(&self.path, e))?;
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes every entry into a new compressed file at `path`, sorted by key.
    ///
    /// The file is written next to `path` first and then renamed over it. Exporting onto the
    /// backing file of this cache compacts it; later appends go to the new file.
    pub fn export(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref();
        let mut state = self.lock();

        let mut tmp_name = OsString::from(path.as_os_str());
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        write_snapshot(&tmp_path, &state.entries).map_err(|e| cache_io_error(&tmp_path, e))?;
        fs::rename(&tmp_path, path).map_err(|e| cache_io_error(path, e))?;

        if is_same_file(path, &self.path) {
            state.file = open_for_append(&self.path)?;
        }
        info!(path = %path.display(), entries = state.entries.len(), "weather cache exported");
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // the map stays consistent even if a holder panicked: every mutation is a single insert
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn open_for_append(path: &Path) -> Result<File, Error> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| cache_io_error(path, e))
}

// appends land at the end of the file, so a broken member would hide everything after it
fn truncate(path: &Path, len: u64) -> Result<(), Error> {
    OpenOptions::new()
        .write(true)
        .open(path)
        .and_then(|file| file.set_len(len))
        .map_err(|e| cache_io_error(path, e))
}

fn validate_entry(key: &str, value: &str) -> Result<(), Error> {
    let invalid = |message: &str| Error::InvalidCacheEntry {
        key: key.to_string(),
        message: message.to_string(),
    };
    if key.contains(DELIMITER) || value.contains(DELIMITER) {
        return Err(invalid("entries must not contain the '_' delimiter"));
    }
    if key.contains('\n') || value.contains('\n') {
        return Err(invalid("entries must not contain line breaks"));
    }
    Ok(())
}

/// Decodes the file one gzip member at a time.
///
/// Returns the offset just past the last member that decoded completely.
fn read_entries(file: File, entries: &mut HashMap<String, String>) -> io::Result<u64> {
    let mut input = BufReader::new(file);
    let mut member = Vec::new();
    let mut intact = 0;
    let mut dropped = 0usize;

    while !input.fill_buf()?.is_empty() {
        member.clear();
        if let Err(e) = GzDecoder::new(&mut input).read_to_end(&mut member) {
            // typically a member cut short by a crash during an append
            warn!(error = %e, loaded = entries.len(), "cache file is truncated, ignoring the rest");
            break;
        }
        intact = input.stream_position()?;

        for line in member.split(|byte| *byte == b'\n').filter(|line| !line.is_empty()) {
            let Some((key, value)) = parse_line(line) else {
                dropped += 1;
                continue;
            };
            if entries.contains_key(key) {
                warn!(key, "duplicate key in cache file, keeping the first value");
                continue;
            }
            entries.insert(key.to_string(), value.to_string());
        }
    }

    if dropped > 0 {
        debug!(dropped, "malformed cache lines dropped");
    }
    Ok(intact)
}

fn parse_line(line: &[u8]) -> Option<(&str, &str)> {
    let line = std::str::from_utf8(line).ok()?;
    let mut fields = line.split(DELIMITER);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(key), Some(value), None) => Some((key, value)),
        _ => None,
    }
}

fn append_line(file: &mut File, key: &str, value: &str) -> io::Result<()> {
    let mut encoder = GzEncoder::new(file, Compression::default());
    writeln!(encoder, "{key}{DELIMITER}{value}")?;
    encoder.finish()?;
    Ok(())
}

fn write_snapshot(path: &Path, entries: &HashMap<String, String>) -> io::Result<()> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(io::BufWriter::new(file), Compression::default());

    let mut keys: Vec<&String> = entries.keys().collect();
    keys.sort();
    for key in keys {
        writeln!(encoder, "{key}{DELIMITER}{}", entries[key])?;
    }

    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
