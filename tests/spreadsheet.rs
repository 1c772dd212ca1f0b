use std::fs;

use assert_matches::assert_matches;

use sra_retriever::error::RetrieverError;
use sra_retriever::spreadsheet::{DEFAULT_ACCESSION_COLUMN, read_accession_column};

#[test]
fn reads_column_from_csv() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metadata.csv");
    fs::write(
        &path,
        "sample,NCBI_SRA_number,host\nS1,SRR1568808,human\nS2,,human\nS3, ERR22 ,mouse\n",
    )
    .unwrap();

    let values = read_accession_column(&path, None, DEFAULT_ACCESSION_COLUMN).unwrap();
    assert_eq!(values, vec!["SRR1568808", "ERR22"]);
}

#[test]
fn reads_column_from_tsv() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metadata.tsv");
    fs::write(&path, "run\tnotes\nSRR1\tfirst\nSRR2\n").unwrap();

    let values = read_accession_column(&path, Some("ignored"), "run").unwrap();
    assert_eq!(values, vec!["SRR1", "SRR2"]);
}

#[test]
fn missing_column_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metadata.csv");
    fs::write(&path, "sample,host\nS1,human\n").unwrap();

    assert_matches!(
        read_accession_column(&path, None, DEFAULT_ACCESSION_COLUMN),
        Err(RetrieverError::MissingColumn { column, .. }) if column == DEFAULT_ACCESSION_COLUMN
    );
}

#[test]
fn unreadable_workbook_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("metadata.xlsx");
    fs::write(&path, b"not a workbook").unwrap();

    assert_matches!(
        read_accession_column(&path, None, DEFAULT_ACCESSION_COLUMN),
        Err(RetrieverError::Spreadsheet(_))
    );
}
