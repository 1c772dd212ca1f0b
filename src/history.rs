use std::path::Path;

use rusqlite::{Connection, OpenFlags};

use crate::error::RetrieverError;

/// Source of accessions retrieved by earlier runs.
pub trait RetrievalHistory {
    fn previously_retrieved(&self) -> Result<Vec<String>, RetrieverError>;
}

/// No record of earlier runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl RetrievalHistory for NoHistory {
    fn previously_retrieved(&self) -> Result<Vec<String>, RetrieverError> {
        Ok(Vec::new())
    }
}

/// Reads past accessions from the first column of a single SQLite query.
pub struct SqliteHistory {
    conn: Connection,
    query: String,
}

impl SqliteHistory {
    pub fn open(db_path: &Path, query: impl Into<String>) -> Result<Self, RetrieverError> {
        let conn = Connection::open_with_flags(db_path, OpenFlags::SQLITE_OPEN_READ_ONLY)
            .map_err(|err| RetrieverError::History(format!("open {}: {err}", db_path.display())))?;
        Ok(Self::with_connection(conn, query))
    }

    pub fn with_connection(conn: Connection, query: impl Into<String>) -> Self {
        Self {
            conn,
            query: query.into(),
        }
    }
}

impl RetrievalHistory for SqliteHistory {
    fn previously_retrieved(&self) -> Result<Vec<String>, RetrieverError> {
        let mut stmt = self
            .conn
            .prepare(&self.query)
            .map_err(|err| RetrieverError::History(err.to_string()))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| RetrieverError::History(err.to_string()))?;

        let mut accessions = Vec::new();
        for row in rows {
            let value = row.map_err(|err| RetrieverError::History(err.to_string()))?;
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                accessions.push(trimmed.to_string());
            }
        }
        Ok(accessions)
    }
}

impl<H: RetrievalHistory + ?Sized> RetrievalHistory for Box<H> {
    fn previously_retrieved(&self) -> Result<Vec<String>, RetrieverError> {
        (**self).previously_retrieved()
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sra_table (SRA TEXT NOT NULL, Project_ID TEXT);
             INSERT INTO sra_table VALUES ('SRR100', 'P1');
             INSERT INTO sra_table VALUES (' ERR200 ', 'P2');
             INSERT INTO sra_table VALUES ('', 'P3');",
        )
        .unwrap();
        conn
    }

    #[test]
    fn reads_first_column() {
        let history = SqliteHistory::with_connection(seeded(), "SELECT SRA FROM sra_table");
        assert_eq!(
            history.previously_retrieved().unwrap(),
            vec!["SRR100".to_string(), "ERR200".to_string()]
        );
    }

    #[test]
    fn bad_query_is_history_error() {
        let history = SqliteHistory::with_connection(seeded(), "SELECT nope FROM missing");
        assert_matches!(
            history.previously_retrieved(),
            Err(RetrieverError::History(_))
        );
    }
}
