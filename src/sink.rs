//! Append-only destinations for product records.

use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{error::WriteError, record::ProductRecord};

pub trait Sink: Send {
    fn write(&mut self, records: &[ProductRecord]) -> Result<(), WriteError>;
}

/// When the crawler hands records to the sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlushPolicy {
    /// After every page.
    #[default]
    Streaming,
    /// Once, when the run ends, whatever the reason it ends.
    Buffered,
}

pub const DEFAULT_LIST_SEPARATOR: &str = "; ";

/// Appends rows to a CSV file, writing the header only when the file is new.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
    list_separator: String,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, columns: Vec<String>) -> Self {
        Self {
            path: path.into(),
            columns,
            list_separator: DEFAULT_LIST_SEPARATOR.to_string(),
        }
    }

    pub fn with_list_separator(mut self, separator: impl Into<String>) -> Self {
        self.list_separator = separator.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn row(&self, record: &ProductRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|column| {
                record
                    .column(column)
                    .map(|value| value.render(&self.list_separator))
                    .unwrap_or_default()
            })
            .collect()
    }
}

impl Sink for CsvSink {
    fn write(&mut self, records: &[ProductRecord]) -> Result<(), WriteError> {
        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| WriteError::DestinationUnavailable {
                path: self.path.clone(),
                source,
            })?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if !file_exists {
            tracing::info!(path = %self.path.display(), "sink: new destination, writing header");
            writer.write_record(&self.columns)?;
        }
        for record in records {
            writer.write_record(self.row(record))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        tracing::debug!(path = %self.path.display(), rows = records.len(), "sink: appended");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FieldValue;

    fn columns() -> Vec<String> {
        ["category", "name", "image_url", "description", "price", "url"]
            .iter()
            .map(|c| c.to_string())
            .collect()
    }

    fn laptop() -> ProductRecord {
        ProductRecord {
            category: "Laptop".into(),
            name: "X1".into(),
            image_url: "i.png".into(),
            description: "d".into(),
            price: "100".into(),
            url: "https://a/b".into(),
            extras: vec![],
        }
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap()
            .records()
            .map(|row| row.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn round_trip_matches_header_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        let mut sink = CsvSink::new(&path, columns());

        sink.write(&[laptop()]).unwrap();

        let rows = read_rows(&path);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], columns());
        assert_eq!(rows[1], ["Laptop", "X1", "i.png", "d", "100", "https://a/b"]);
    }

    #[test]
    fn header_is_written_once_across_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");

        for _ in 0..3 {
            let mut sink = CsvSink::new(&path, columns());
            sink.write(&[laptop()]).unwrap();
            sink.write(&[]).unwrap();
        }

        let rows = read_rows(&path);
        let headers = rows.iter().filter(|row| row[0] == "category").count();
        assert_eq!(headers, 1);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn empty_write_to_fresh_destination_only_writes_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        CsvSink::new(&path, columns()).write(&[]).unwrap();
        assert_eq!(read_rows(&path), vec![columns()]);
    }

    #[test]
    fn list_values_are_joined_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.csv");
        let mut record = laptop();
        record.description = FieldValue::List(vec!["14 inch".into(), "16GB".into()]);

        CsvSink::new(&path, columns())
            .with_list_separator(" | ")
            .write(&[record])
            .unwrap();

        assert_eq!(read_rows(&path)[1][3], "14 inch | 16GB");
    }

    #[test]
    fn missing_parent_directory_is_destination_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("products.csv");
        let err = CsvSink::new(&path, columns()).write(&[laptop()]).unwrap_err();
        assert!(matches!(err, WriteError::DestinationUnavailable { .. }));
    }
}
