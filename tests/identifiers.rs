use std::fs;

use assert_matches::assert_matches;

use sra_retriever::error::RetrieverError;
use sra_retriever::identifiers::{IdentifierRecord, IdentifierTable, SubmissionTags};

#[test]
fn written_log_reads_back_in_order() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("SRA-Numbers").join("sra-log");
    let records = vec![
        IdentifierRecord {
            accession: "SRR1568808".to_string(),
            tags: SubmissionTags::new("PRJ42", "alice"),
        },
        IdentifierRecord {
            accession: "ERR000001".to_string(),
            tags: SubmissionTags::new("PRJ42", "alice"),
        },
    ];

    IdentifierTable::write(&path, &records).unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "SRR1568808\tPRJ42\talice\nERR000001\tPRJ42\talice\n"
    );

    let table = IdentifierTable::read(&path).unwrap();
    assert_eq!(table.accessions(), ["SRR1568808", "ERR000001"]);
    assert_eq!(table.tags("ERR000001").fields(), ["PRJ42", "alice"]);
}

#[test]
fn short_lines_get_empty_tags() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("sra-log");
    fs::write(&path, "SRR1\n\nABC\tP1\r\n").unwrap();

    let table = IdentifierTable::read(&path).unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.tags("SRR1").fields(), ["", ""]);
    assert_eq!(table.tags("ABC").fields(), ["P1", ""]);
    assert_eq!(table.tags("SRR999").fields(), ["", ""]);
}

#[test]
fn missing_log_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("sra-log");
    assert_matches!(
        IdentifierTable::read(&path),
        Err(RetrieverError::MissingIdentifierLog(_))
    );
}
