use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::warn;

use crate::domain::ErrorCategory;
use crate::error::RetrieverError;
use crate::identifiers::IdentifierTable;

pub const LOG_HEADER: &str = "Error_Time\tSRA_Accession_Number\tProject_ID\tUser_ID\tError_Reason";
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub time: String,
    pub accession: String,
    pub fields: Vec<String>,
    pub reason: String,
}

impl LogEntry {
    fn to_line(&self) -> String {
        let mut line = format!("{}\t{}\t", self.time, self.accession);
        for field in &self.fields {
            line.push_str(field);
            line.push('\t');
        }
        line.push_str(&self.reason);
        line.push('\n');
        line
    }
}

/// Files touched by one `ErrorLog::record` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogWrite {
    pub aggregate: Utf8PathBuf,
    pub category: Option<Utf8PathBuf>,
}

/// Append-only TSV error logs: one aggregate file plus one file per category.
#[derive(Debug, Clone)]
pub struct ErrorLog {
    dir: Utf8PathBuf,
    aggregate_name: String,
}

impl ErrorLog {
    pub fn new(dir: impl Into<Utf8PathBuf>, aggregate_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            aggregate_name: aggregate_name.into(),
        }
    }

    pub fn aggregate_path(&self) -> Utf8PathBuf {
        self.dir.join(&self.aggregate_name)
    }

    pub fn category_path(&self, category: ErrorCategory) -> Option<Utf8PathBuf> {
        category.log_file().map(|name| self.dir.join(name))
    }

    pub fn record(
        &self,
        table: &IdentifierTable,
        accession: &str,
        category: ErrorCategory,
        reason: &str,
    ) -> Result<LogWrite, RetrieverError> {
        let tags = table.tags(accession);
        let entry = LogEntry {
            time: chrono::Local::now().format(TIME_FORMAT).to_string(),
            accession: accession.to_string(),
            fields: tags.fields().iter().map(|field| field.to_string()).collect(),
            reason: reason.to_string(),
        };

        fs::create_dir_all(self.dir.as_std_path())
            .map_err(|err| RetrieverError::ErrorLog(format!("{}: {err}", self.dir)))?;

        let aggregate = self.aggregate_path();
        append_entry(&aggregate, &entry)?;

        let category_path = self.category_path(category);
        match &category_path {
            Some(path) => append_entry(path, &entry)?,
            None => warn!(
                "error \"{reason}\" ({}) for {accession} is only recorded in {}",
                category.code(),
                self.aggregate_name
            ),
        }

        Ok(LogWrite {
            aggregate,
            category: category_path,
        })
    }
}

/// The header is decided by the first line alone: it is written when the
/// file has no first line. A file already starting with the header, or with
/// data, is appended to as is.
fn append_entry(path: &Utf8Path, entry: &LogEntry) -> Result<(), RetrieverError> {
    let map_err = |err: std::io::Error| RetrieverError::ErrorLog(format!("{path}: {err}"));
    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path.as_std_path())
        .map_err(map_err)?;

    let mut first_line = String::new();
    BufReader::new(&file)
        .read_line(&mut first_line)
        .map_err(map_err)?;

    if first_line.is_empty() {
        writeln!(file, "{LOG_HEADER}").map_err(map_err)?;
    }
    file.write_all(entry.to_line().as_bytes()).map_err(map_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifiers::{IdentifierRecord, SubmissionTags};

    fn table() -> IdentifierTable {
        IdentifierTable::from_records([IdentifierRecord {
            accession: "SRR1".to_string(),
            tags: SubmissionTags::new("P7", "U9"),
        }])
    }

    fn temp_log() -> (tempfile::TempDir, ErrorLog) {
        let temp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::from_path_buf(temp.path().join("logs")).unwrap();
        (temp, ErrorLog::new(dir, "error-log.tsv"))
    }

    #[test]
    fn header_written_once() {
        let (_temp, log) = temp_log();
        for _ in 0..3 {
            log.record(&table(), "SRR1", ErrorCategory::Oversize, "too big")
                .unwrap();
        }
        let content = fs::read_to_string(log.aggregate_path()).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], LOG_HEADER);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.iter().filter(|line| **line == LOG_HEADER).count(), 1);
    }

    #[test]
    fn entry_carries_tags() {
        let (_temp, log) = temp_log();
        let write = log
            .record(&table(), "SRR1", ErrorCategory::AccessDenied, "denied")
            .unwrap();
        let category = write.category.unwrap();
        assert!(category.ends_with("private-sra-log.tsv"));
        let content = fs::read_to_string(category).unwrap();
        let row = content.lines().nth(1).unwrap();
        let fields: Vec<_> = row.split('\t').collect();
        assert_eq!(&fields[1..], &["SRR1", "P7", "U9", "denied"]);
        assert!(chrono::NaiveDateTime::parse_from_str(fields[0], TIME_FORMAT).is_ok());
    }

    #[test]
    fn data_first_log_never_gets_header() {
        let (_temp, log) = temp_log();
        fs::create_dir_all(log.aggregate_path().parent().unwrap()).unwrap();
        fs::write(log.aggregate_path(), "old\tSRR0\t\t\tsomething\n").unwrap();
        log.record(&table(), "SRR1", ErrorCategory::Uncategorized, "x")
            .unwrap();
        let content = fs::read_to_string(log.aggregate_path()).unwrap();
        assert!(!content.contains(LOG_HEADER));
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn uncategorized_only_in_aggregate() {
        let (_temp, log) = temp_log();
        let write = log
            .record(&table(), "SRR2", ErrorCategory::Uncategorized, "removal failed")
            .unwrap();
        assert_eq!(write.category, None);
        let content = fs::read_to_string(write.aggregate).unwrap();
        assert!(content.ends_with("SRR2\t\t\tremoval failed\n"));
    }
}
