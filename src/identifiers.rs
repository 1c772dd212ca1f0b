use std::collections::HashMap;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::domain::Accession;
use crate::error::RetrieverError;

/// Submission metadata stored next to each accession in the identifier log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionTags {
    pub project_id: String,
    pub user_id: String,
}

impl SubmissionTags {
    pub fn new(project_id: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            user_id: user_id.into(),
        }
    }

    pub fn fields(&self) -> [&str; 2] {
        [&self.project_id, &self.user_id]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierRecord {
    pub accession: String,
    pub tags: SubmissionTags,
}

/// Accessions in first-seen order, each with its submission tags.
#[derive(Debug, Clone, Default)]
pub struct IdentifierTable {
    order: Vec<String>,
    tags: HashMap<String, SubmissionTags>,
}

impl IdentifierTable {
    pub fn from_records(records: impl IntoIterator<Item = IdentifierRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table.insert(record);
        }
        table
    }

    pub fn insert(&mut self, record: IdentifierRecord) {
        let key = record.accession.trim().to_string();
        if !self.tags.contains_key(&key) {
            self.order.push(key.clone());
        }
        self.tags.insert(key, record.tags);
    }

    pub fn accessions(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Tags for `accession`; unknown accessions get empty tags.
    pub fn tags(&self, accession: &str) -> SubmissionTags {
        self.tags
            .get(accession.trim())
            .cloned()
            .unwrap_or_default()
    }

    pub fn parse(content: &str) -> Self {
        let records = content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_line);
        Self::from_records(records)
    }

    pub fn read(path: &Path) -> Result<Self, RetrieverError> {
        if !path.exists() {
            return Err(RetrieverError::MissingIdentifierLog(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)
            .map_err(|err| RetrieverError::IdentifierLog(format!("{}: {err}", path.display())))?;
        Ok(Self::parse(&content))
    }

    /// Replaces the log at `path` with one `accession\tproject\tuser` line per record.
    pub fn write(path: &Path, records: &[IdentifierRecord]) -> Result<(), RetrieverError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
        }
        let file =
            fs::File::create(path).map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
        let mut writer = BufWriter::new(file);
        for record in records {
            writeln!(
                writer,
                "{}\t{}\t{}",
                record.accession, record.tags.project_id, record.tags.user_id
            )
            .map_err(|err| RetrieverError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| RetrieverError::Filesystem(err.to_string()))
    }
}

fn parse_line(line: &str) -> IdentifierRecord {
    let mut fields = line.trim_end_matches(['\r', '\n']).split('\t');
    let accession = fields.next().unwrap_or_default().trim().to_string();
    let project_id = fields.next().unwrap_or_default().to_string();
    let user_id = fields.next().unwrap_or_default().to_string();
    IdentifierRecord {
        accession,
        tags: SubmissionTags::new(project_id, user_id),
    }
}

/// Result of the format filter, both halves in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub accepted: Vec<Accession>,
    pub rejected: Vec<String>,
}

pub fn partition_accessions<S: AsRef<str>>(raw: &[S]) -> Partition {
    let mut partition = Partition::default();
    for value in raw {
        match value.as_ref().parse::<Accession>() {
            Ok(accession) => partition.accepted.push(accession),
            Err(_) => partition.rejected.push(value.as_ref().trim().to_string()),
        }
    }
    partition
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_keeps_order() {
        let raw = ["SRR1", "ABC", "err22", " SRR3 ", "SRX4"];
        let partition = partition_accessions(&raw);
        let accepted: Vec<_> = partition.accepted.iter().map(|a| a.as_str()).collect();
        assert_eq!(accepted, vec!["SRR1", "err22", "SRR3"]);
        assert_eq!(partition.rejected, vec!["ABC", "SRX4"]);
    }

    #[test]
    fn parse_table_lines() {
        let table = IdentifierTable::parse("SRR1\tP1\tU1\n\nABC\tP2\n SRR1 \tP3\tU3\r\n");
        assert_eq!(table.accessions(), &["SRR1".to_string(), "ABC".to_string()]);
        assert_eq!(table.tags("SRR1"), SubmissionTags::new("P3", "U3"));
        assert_eq!(table.tags("ABC"), SubmissionTags::new("P2", ""));
        assert_eq!(table.tags("SRR9"), SubmissionTags::default());
    }
}
