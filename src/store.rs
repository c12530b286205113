//! Row-oriented table storage.
//!
//! Tables are addressed by path. The CSV implementation re-reads the file on
//! every call; nothing is cached between calls, so edits made by other
//! processes (or by hand) are always visible on the next read.
//!
//! Appends are not locked. Two processes appending at the same moment may
//! interleave their rows.
//!
//! An append that widens the header rewrites the whole file. `CsvStore`
//! remembers the bytes from before each widening so that removing that row
//! again puts the narrower file back. Those snapshots live in memory only; after
//! a restart, removing a widening row keeps the wider header.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::record::Record;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Table not found: {0}")]
    NotFound(PathBuf),

    #[error("Table has no rows to remove: {0}")]
    EmptyTable(PathBuf),

    #[error("Refusing to append a row with no fields to {0}")]
    EmptyRecord(PathBuf),

    #[error("I/O error on table: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed table: {0}")]
    Csv(#[from] csv::Error),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound(_))
    }
}

/// Storage for keyed tables.
#[async_trait]
pub trait TabularStore: Send + Sync {
    /// Read every data row of a table.
    async fn read_all(&self, table: &Path) -> Result<Vec<Record>, StoreError>;

    /// Read only the header row of a table.
    async fn read_headers(&self, table: &Path) -> Result<Vec<String>, StoreError>;

    /// Append one row, creating the table (header from the record's keys) if needed.
    ///
    /// A record with no fields is rejected with [`StoreError::EmptyRecord`].
    async fn append(&self, table: &Path, record: &Record) -> Result<(), StoreError>;

    /// Remove and return the most recently appended row.
    async fn remove_last(&self, table: &Path) -> Result<Record, StoreError>;
}

/// CSV files on the local filesystem.
#[derive(Debug, Default)]
pub struct CsvStore {
    widenings: Arc<Mutex<HashMap<PathBuf, Vec<Widening>>>>,
}

/// File contents around one header-widening append.
#[derive(Debug)]
struct Widening {
    /// The whole file before the append.
    before: Vec<u8>,
    /// The rewritten header and older rows, up to where the new row starts.
    widened_prefix: Vec<u8>,
}

impl CsvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock(
    widenings: &Mutex<HashMap<PathBuf, Vec<Widening>>>,
) -> MutexGuard<'_, HashMap<PathBuf, Vec<Widening>>> {
    widenings.lock().unwrap_or_else(|e| e.into_inner())
}

#[async_trait]
impl TabularStore for CsvStore {
    async fn read_all(&self, table: &Path) -> Result<Vec<Record>, StoreError> {
        let path = table.to_path_buf();
        blocking(move || read_all_sync(&path)).await
    }

    async fn read_headers(&self, table: &Path) -> Result<Vec<String>, StoreError> {
        let path = table.to_path_buf();
        blocking(move || {
            let mut reader = open_reader(&path)?;
            Ok(reader.headers()?.iter().map(str::to_string).collect())
        })
        .await
    }

    async fn append(&self, table: &Path, record: &Record) -> Result<(), StoreError> {
        let path = table.to_path_buf();
        let record = record.clone();
        let widenings = Arc::clone(&self.widenings);
        blocking(move || {
            if let Some(widening) = append_sync(&path, &record)? {
                lock(&widenings).entry(path).or_default().push(widening);
            }
            Ok(())
        })
        .await
    }

    async fn remove_last(&self, table: &Path) -> Result<Record, StoreError> {
        let path = table.to_path_buf();
        let widenings = Arc::clone(&self.widenings);
        blocking(move || {
            let mut widenings = lock(&widenings);
            remove_last_sync(&path, widenings.get_mut(&path))
        })
        .await
    }
}

async fn blocking<T, F>(f: F) -> Result<T, StoreError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

fn open_file(path: &Path) -> Result<File, StoreError> {
    File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StoreError::NotFound(path.to_path_buf()),
        _ => StoreError::Io(e),
    })
}

fn open_reader(path: &Path) -> Result<csv::Reader<File>, StoreError> {
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(open_file(path)?))
}

fn read_all_sync(path: &Path) -> Result<Vec<Record>, StoreError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();
    let mut rows = Vec::new();
    for row in reader.records() {
        let row = row?;
        rows.push(Record::from_row(headers.iter(), row.iter()));
    }
    Ok(rows)
}

fn encode_rows<'a, I>(rows: I) -> Result<Vec<u8>, StoreError>
where
    I: IntoIterator<Item = Vec<&'a str>>,
{
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.into_inner().map_err(|e| StoreError::Io(e.into_error()))
}

fn row_in_order<'a>(headers: &'a [String], record: &'a Record) -> Vec<&'a str> {
    headers
        .iter()
        .map(|h| record.get(h).unwrap_or(""))
        .collect()
}

/// Write `bytes` to a sibling temp file, then move it over `path`.
fn replace_file(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp_path = path.with_extension("csv.tmp");
    fs::write(&tmp_path, bytes)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Returns the snapshot to keep when the append had to widen the header.
fn append_sync(path: &Path, record: &Record) -> Result<Option<Widening>, StoreError> {
    if record.is_empty() {
        return Err(StoreError::EmptyRecord(path.to_path_buf()));
    }

    let existing_len = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => 0,
        Err(e) => return Err(e.into()),
    };

    if existing_len == 0 {
        let headers: Vec<String> = record.keys().map(str::to_string).collect();
        let bytes = encode_rows([
            headers.iter().map(String::as_str).collect::<Vec<_>>(),
            row_in_order(&headers, record),
        ])?;
        fs::write(path, bytes)?;
        return Ok(None);
    }

    let mut headers: Vec<String> = open_reader(path)?
        .headers()?
        .iter()
        .map(str::to_string)
        .collect();
    let new_columns: Vec<String> = record
        .keys()
        .filter(|k| !headers.iter().any(|h| h.as_str() == *k))
        .map(str::to_string)
        .collect();

    if !new_columns.is_empty() {
        tracing::info!(
            "Widening {} with new columns {:?}",
            path.display(),
            new_columns
        );
        let before = fs::read(path)?;
        let rows = read_all_sync(path)?;
        headers.extend(new_columns);
        let widened_prefix = encode_rows(
            std::iter::once(headers.iter().map(String::as_str).collect::<Vec<_>>())
                .chain(rows.iter().map(|r| row_in_order(&headers, r))),
        )?;
        let mut bytes = widened_prefix.clone();
        bytes.extend(encode_rows([row_in_order(&headers, record)])?);
        replace_file(path, &bytes)?;
        return Ok(Some(Widening {
            before,
            widened_prefix,
        }));
    }

    let mut file = OpenOptions::new().read(true).append(true).open(path)?;
    let mut bytes = Vec::new();
    if !ends_with_newline(&mut file)? {
        bytes.push(b'\n');
    }
    bytes.extend(encode_rows([row_in_order(&headers, record)])?);
    file.write_all(&bytes)?;
    Ok(None)
}

fn ends_with_newline(file: &mut File) -> Result<bool, StoreError> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::Start(len - 1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// True if the first `len` bytes of the file are exactly `expected`.
fn has_prefix(path: &Path, len: u64, expected: &[u8]) -> Result<bool, StoreError> {
    if expected.len() as u64 != len {
        return Ok(false);
    }
    let mut prefix = vec![0u8; expected.len()];
    open_file(path)?.read_exact(&mut prefix)?;
    Ok(prefix == expected)
}

fn remove_last_sync(
    path: &Path,
    widenings: Option<&mut Vec<Widening>>,
) -> Result<Record, StoreError> {
    let mut reader = open_reader(path)?;
    let headers = reader.headers()?.clone();

    let mut current = csv::StringRecord::new();
    let mut last: Option<(u64, csv::StringRecord)> = None;
    while reader.read_record(&mut current)? {
        let offset = current.position().map(|p| p.byte()).unwrap_or_default();
        last = Some((offset, current.clone()));
    }
    drop(reader);

    let (offset, row) = last.ok_or_else(|| StoreError::EmptyTable(path.to_path_buf()))?;

    // The row being removed widened the header if everything before it is
    // still exactly what that widening wrote.
    let widening = match widenings {
        Some(stack) => {
            let matches = match stack.last() {
                Some(top) => has_prefix(path, offset, &top.widened_prefix)?,
                None => false,
            };
            if matches {
                stack.pop()
            } else {
                None
            }
        }
        None => None,
    };

    match widening {
        Some(widening) => {
            tracing::info!("Restoring {} to its header before the last append", path.display());
            replace_file(path, &widening.before)?;
        }
        None => OpenOptions::new().write(true).open(path)?.set_len(offset)?,
    }
    Ok(Record::from_row(headers.iter(), row.iter()))
}
