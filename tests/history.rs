use rusqlite::Connection;

use sra_retriever::history::{RetrievalHistory, SqliteHistory};

#[test]
fn reads_past_accessions_from_database_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("past.sqlite");
    {
        let conn = Connection::open(&path).unwrap();
        conn.execute_batch(
            "CREATE TABLE sra_table (SRA TEXT);
             INSERT INTO sra_table VALUES ('SRR5'), (' SRR6 '), ('');",
        )
        .unwrap();
    }

    let history = SqliteHistory::open(&path, "SELECT SRA FROM sra_table").unwrap();
    assert_eq!(history.previously_retrieved().unwrap(), vec!["SRR5", "SRR6"]);
}

#[test]
fn missing_table_is_a_history_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("empty.sqlite");
    Connection::open(&path)
        .unwrap()
        .execute_batch("CREATE TABLE other (x TEXT);")
        .unwrap();

    let history = SqliteHistory::open(&path, "SELECT SRA FROM sra_table").unwrap();
    assert!(history.previously_retrieved().is_err());
}
