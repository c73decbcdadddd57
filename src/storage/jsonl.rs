//! Append-only JSONL record log.
//!
//! Each record is one line of JSON. Appends are a single write of a complete
//! line to a file opened in append mode, so writers in different processes
//! never interleave partial records. Readers skip anything that does not parse,
//! which covers a final line still being written by another process.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, ErrorKind, Read, Take, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde::{Serialize, de::DeserializeOwned};

use crate::error::{FactoryError, Result};

/// A line-delimited log of records of type `T`
#[derive(Debug)]
pub struct JsonlLog<T> {
    path: PathBuf,
    write_lock: Mutex<()>,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonlLog<T> {
    /// Open a log at the given path. The file is created on first append.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Serialize> JsonlLog<T> {
    /// Append one record as a complete line
    pub fn append(&self, record: &T) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| FactoryError::Storage(format!("log write lock poisoned: {}", e)))?;
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;

        debug!("Appended {} bytes to {}", line.len(), self.path.display());
        Ok(())
    }
}

impl<T: DeserializeOwned> JsonlLog<T> {
    /// Lazily read every well-formed record in file order.
    ///
    /// Only the bytes present when this is called are read; later appends are
    /// not observed by the returned iterator. A missing file reads as empty.
    pub fn read_all(&self) -> Result<Records<T>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Records::empty(&self.path)),
            Err(e) => return Err(e.into()),
        };
        let len = file.metadata()?.len();
        Ok(Records {
            path: self.path.clone(),
            reader: Some(BufReader::new(file.take(len))),
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
            _record: PhantomData,
        })
    }
}

/// Iterator over the records of a [`JsonlLog`] snapshot
pub struct Records<T> {
    path: PathBuf,
    reader: Option<BufReader<Take<File>>>,
    buf: Vec<u8>,
    line_no: usize,
    skipped: usize,
    _record: PhantomData<fn() -> T>,
}

impl<T> Records<T> {
    fn empty(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            reader: None,
            buf: Vec::new(),
            line_no: 0,
            skipped: 0,
            _record: PhantomData,
        }
    }

    /// Number of non-blank lines skipped so far because they did not parse.
    ///
    /// A read error ends the iteration and counts as one skipped line, so a
    /// partial read is never reported as clean.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<T: DeserializeOwned> Iterator for Records<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        loop {
            let reader = self.reader.as_mut()?;
            self.buf.clear();
            match reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.reader = None;
                    return None;
                }
                Ok(_) => {
                    self.line_no += 1;
                    let Ok(text) = std::str::from_utf8(&self.buf) else {
                        warn!("{}:{}: skipping non-UTF-8 line", self.path.display(), self.line_no);
                        self.skipped += 1;
                        continue;
                    };
                    let text = text.trim();
                    if text.is_empty() {
                        continue;
                    }
                    match serde_json::from_str(text) {
                        Ok(record) => return Some(record),
                        Err(e) => {
                            warn!("{}:{}: skipping malformed record: {}", self.path.display(), self.line_no, e);
                            self.skipped += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!("{}: read stopped after line {}: {}", self.path.display(), self.line_no, e);
                    self.skipped += 1;
                    self.reader = None;
                    return None;
                }
            }
        }
    }
}
