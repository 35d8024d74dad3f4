// ABOUTME: JSON output of article records and the numbered batch driver.
// ABOUTME: Batch numbering continues from the .json files already present in the output directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::{ErrorCode, ExtractError};
use crate::extractor::Extractor;
use crate::record::ArticleRecord;
use crate::sites::site_file_prefix;

/// Serializes `value` as UTF-8 JSON with 4-space indentation.
fn to_indented_json<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"    "));
    value.serialize(&mut ser)?;
    // serde_json only ever writes valid UTF-8
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Serializes a record as UTF-8 JSON with 4-space indentation.
pub fn record_to_json(record: &ArticleRecord) -> Result<String, serde_json::Error> {
    to_indented_json(record)
}

/// Serializes records as a JSON array, indented like [`record_to_json`].
pub fn records_to_json(records: &[ArticleRecord]) -> Result<String, serde_json::Error> {
    to_indented_json(records)
}

/// Writes `record` to `<dir>/<name>.json`, creating `dir` and overwriting an existing file.
pub fn write_record(
    dir: &Path,
    name: &str,
    record: &ArticleRecord,
) -> Result<PathBuf, ExtractError> {
    let path = dir.join(format!("{}.json", name));
    let shown = path.display().to_string();

    fs::create_dir_all(dir).map_err(|e| {
        ExtractError::output(
            &shown,
            "WriteRecord",
            Some(anyhow::anyhow!("failed to create {}: {}", dir.display(), e)),
        )
    })?;

    let json = record_to_json(record)
        .map_err(|e| ExtractError::output(&shown, "WriteRecord", Some(anyhow::anyhow!(e))))?;

    fs::write(&path, json).map_err(|e| {
        ExtractError::output(&shown, "WriteRecord", Some(anyhow::anyhow!(e)))
    })?;

    tracing::info!(path = %shown, source = %record.source, "record written");
    Ok(path)
}

/// Counts the `.json` files directly inside `dir`. A missing directory counts as empty.
pub fn count_existing_records(dir: &Path) -> Result<usize, ExtractError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
        Err(e) => {
            return Err(ExtractError::output(
                dir.display().to_string(),
                "CountRecords",
                Some(anyhow::anyhow!(e)),
            ))
        }
    };

    let count = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".json"))
        .count();
    Ok(count)
}

/// A URL that produced no file, and why.
#[derive(Debug)]
pub struct BatchFailure {
    pub url: String,
    pub code: ErrorCode,
    pub error: ExtractError,
}

/// Outcome of a batch run.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files written, in input order.
    pub written: Vec<PathBuf>,
    pub failures: Vec<BatchFailure>,
}

impl BatchReport {
    /// Returns true if every URL produced a file.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Writes one numbered file per successfully extracted URL.
///
/// Files are named `<SITE>_<n>.json`. Numbering starts after the `.json`
/// files already in the directory; failed URLs do not consume a number.
#[derive(Debug)]
pub struct BatchWriter {
    dir: PathBuf,
    next_index: usize,
}

impl BatchWriter {
    /// Prepares a writer for `dir`, counting the records already there.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let dir = dir.into();
        let existing = count_existing_records(&dir)?;
        Ok(Self {
            dir,
            next_index: existing + 1,
        })
    }

    /// The number the next written file will carry.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Writes `record` under the next sequence number.
    pub fn write(&mut self, record: &ArticleRecord) -> Result<PathBuf, ExtractError> {
        let name = format!("{}_{}", site_file_prefix(&record.source), self.next_index);
        let path = write_record(&self.dir, &name, record)?;
        self.next_index += 1;
        Ok(path)
    }

    /// Extracts and writes each URL in order; each record is on disk before the next URL starts.
    pub fn run<I, S>(&mut self, extractor: &mut Extractor, urls: I) -> BatchReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut report = BatchReport::default();
        extractor.extract_each(urls, |url, outcome| {
            let written = outcome.and_then(|record| self.write(&record));
            match written {
                Ok(path) => report.written.push(path),
                Err(error) => report.failures.push(BatchFailure {
                    url: url.to_string(),
                    code: error.code,
                    error,
                }),
            }
        });
        report
    }
}
