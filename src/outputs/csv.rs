//! CSV artifact output.
//!
//! [`CsvExporter`] buffers every record of a run and serializes them once
//! the crawl is over:
//!
//! 1. stable sort by normalized date, newest first, unknown dates last
//! 2. re-render known dates as `Mon DD, YYYY, HH:MM ET`
//! 3. header row, then one row per record, every field quoted, CRLF endings
//!
//! The artifact is written next to its final path and renamed into place,
//! so a failed write never leaves a truncated file behind.
//!
//! [`load_artifact`] reads an artifact back for the digest stage. A file
//! that is empty or unreadable is deleted and reported as "no data". A
//! valid export that lacks the `title` or `link` column (see
//! [`CsvExporter::with_fields`]) is also "no data" but stays on disk.

use crate::dates::{format_instant, normalize};
use crate::error::CrawlError;
use crate::models::{ArticleRecord, CATEGORY_SEPARATOR};
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

/// Buffers records and serializes them as a sorted, fully quoted CSV.
#[derive(Debug, Default)]
pub struct CsvExporter {
    records: Vec<ArticleRecord>,
    fields: Option<Vec<String>>,
}

impl CsvExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Export only the named columns, in this order. Unknown names produce
    /// empty cells.
    pub fn with_fields(fields: Vec<String>) -> Self {
        CsvExporter {
            records: Vec::new(),
            fields: Some(fields),
        }
    }

    pub fn export_item(&mut self, record: ArticleRecord) {
        self.records.push(record);
    }

    /// Sort, re-render and serialize every buffered record. `today` anchors
    /// bare times of day.
    #[instrument(level = "info", skip_all, fields(records = self.records.len()))]
    pub fn finish(self, today: NaiveDate) -> Result<Vec<u8>, CrawlError> {
        let fields: Vec<String> = self
            .fields
            .unwrap_or_else(|| ArticleRecord::FIELDS.iter().map(|f| f.to_string()).collect());
        let records = sort_newest_first(self.records, today);

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .terminator(Terminator::CRLF)
            .from_writer(Vec::new());

        writer.write_record(&fields)?;
        for record in &records {
            writer.write_record(
                fields
                    .iter()
                    .map(|name| record.field(name).unwrap_or_default().into_owned()),
            )?;
        }

        writer
            .into_inner()
            .map_err(|e| CrawlError::Csv(e.into_error().into()))
    }
}

/// Stable newest-first sort with date re-rendering. Records whose date
/// cannot be parsed keep their raw text and their relative order at the end.
pub fn sort_newest_first(records: Vec<ArticleRecord>, today: NaiveDate) -> Vec<ArticleRecord> {
    let mut keyed: Vec<_> = records
        .into_iter()
        .map(|r| (normalize(&r.raw_date, today), r))
        .collect();
    keyed.sort_by(|a, b| b.0.cmp(&a.0));

    keyed
        .into_iter()
        .map(|(date, mut record)| {
            if date.known {
                record.raw_date = format_instant(date.instant);
            }
            record
        })
        .collect()
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}

/// Delete a previous run's artifact so the new run never appends to it.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn remove_previous(path: &Path) -> Result<(), CrawlError> {
    match fs::remove_file(path).await {
        Ok(()) => {
            info!("Removed previous artifact");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(CrawlError::Export {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Write `bytes` to `path` via a sibling `.part` file and a rename.
#[instrument(level = "info", skip_all, fields(path = %path.display(), bytes = bytes.len()))]
pub async fn write_artifact(path: &Path, bytes: &[u8]) -> Result<(), CrawlError> {
    let tmp = part_path(path);
    let result = async {
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await
    }
    .await;

    match result {
        Ok(()) => {
            info!("Wrote CSV artifact");
            Ok(())
        }
        Err(source) => {
            let _ = fs::remove_file(&tmp).await;
            Err(CrawlError::Export {
                path: path.to_path_buf(),
                source,
            })
        }
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    page: String,
    title: String,
    link: String,
    #[serde(default)]
    date: String,
    #[serde(default)]
    categories: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    full_text: String,
}

impl From<CsvRow> for ArticleRecord {
    fn from(row: CsvRow) -> Self {
        ArticleRecord {
            page: row.page,
            title: row.title,
            link: row.link,
            raw_date: row.date,
            categories: row
                .categories
                .split(CATEGORY_SEPARATOR)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect(),
            summary: row.summary,
            full_text: row.full_text,
        }
    }
}

/// Columns a row needs to be usable downstream.
const REQUIRED_COLUMNS: [&str; 2] = ["title", "link"];

/// Parse an artifact.
///
/// An empty file or bytes that are not valid CSV give
/// [`CrawlError::MalformedArtifact`]; valid CSV without a required column
/// gives [`CrawlError::MissingColumn`].
pub fn parse_artifact(path: &Path, bytes: &[u8]) -> Result<Vec<ArticleRecord>, CrawlError> {
    let malformed = |reason: String| CrawlError::MalformedArtifact {
        path: path.to_path_buf(),
        reason,
    };

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(malformed("file is empty".into()));
    }

    let mut reader = csv::Reader::from_reader(bytes);
    let headers = reader.headers().map_err(|e| malformed(e.to_string()))?;
    if let Some(column) = REQUIRED_COLUMNS
        .iter()
        .find(|column| !headers.iter().any(|h| h == **column))
    {
        return Err(CrawlError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        });
    }

    reader
        .deserialize::<CsvRow>()
        .map(|row| row.map(ArticleRecord::from).map_err(|e| malformed(e.to_string())))
        .collect()
}

/// Load a previous artifact. `Ok(None)` means there is no usable data: the
/// file is missing, lacks a required column, or was empty/malformed and has
/// been deleted.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_artifact(path: &Path) -> Result<Option<Vec<ArticleRecord>>, CrawlError> {
    let bytes = match fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            warn!(error = %e, "Artifact is unreadable; discarding it");
            let _ = fs::remove_file(path).await;
            return Ok(None);
        }
    };

    match parse_artifact(path, &bytes) {
        Ok(records) => {
            info!(records = records.len(), "Loaded artifact");
            Ok(Some(records))
        }
        Err(e @ CrawlError::MissingColumn { .. }) => {
            warn!(error = %e, "Artifact cannot be summarized; leaving it in place");
            Ok(None)
        }
        Err(e) => {
            warn!(error = %e, "Discarding unusable artifact; run the crawl to regenerate it");
            remove_previous(path).await?;
            Ok(None)
        }
    }
}
