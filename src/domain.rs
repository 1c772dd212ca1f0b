use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::RetrieverError;

static ACCESSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(SRR|ERR)[0-9]+$").expect("accession pattern is valid"));

static MAX_SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+[KMGTkmgt]?$").expect("size pattern is valid"));

/// A run accession such as `SRR1568808`. Surrounding whitespace is dropped,
/// the case is kept exactly as supplied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Wraps `value` without the format check, for runs with verification off.
    pub(crate) fn unchecked(value: &str) -> Self {
        Self(value.trim().to_string())
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = RetrieverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        if !ACCESSION_RE.is_match(normalized) {
            return Err(RetrieverError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

impl AsRef<str> for Accession {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Value handed to `prefetch -X`, e.g. `70G`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MaxSize(String);

impl MaxSize {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MaxSize {
    fn default() -> Self {
        Self("70G".to_string())
    }
}

impl fmt::Display for MaxSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MaxSize {
    type Err = RetrieverError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if !MAX_SIZE_RE.is_match(trimmed) {
            return Err(RetrieverError::InvalidMaxSize(value.to_string()));
        }
        Ok(Self(trimmed.to_uppercase()))
    }
}

impl TryFrom<String> for MaxSize {
    type Error = RetrieverError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MaxSize> for String {
    fn from(value: MaxSize) -> Self {
        value.0
    }
}

/// How `fasterq-dump` splits paired reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SplitMode {
    #[default]
    #[serde(rename = "split-3")]
    #[value(name = "split-3")]
    Split3,
    SplitFiles,
}

impl SplitMode {
    pub fn flag(&self) -> &'static str {
        match self {
            SplitMode::Split3 => "--split-3",
            SplitMode::SplitFiles => "--split-files",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Split3 => write!(f, "split-3"),
            SplitMode::SplitFiles => write!(f, "split-files"),
        }
    }
}

/// Why an accession ended up in the error logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    InvalidFormat,
    AccessDenied,
    NotFound,
    Oversize,
    PreviouslyRetrieved,
    ValidationFailure,
    Uncategorized,
}

impl ErrorCategory {
    /// Legacy error code carried in console messages.
    pub fn code(&self) -> &'static str {
        match self {
            ErrorCategory::InvalidFormat | ErrorCategory::NotFound => "404",
            ErrorCategory::AccessDenied => "403",
            ErrorCategory::Oversize => "1101",
            ErrorCategory::PreviouslyRetrieved => "1102",
            ErrorCategory::ValidationFailure => "validation-failure",
            ErrorCategory::Uncategorized => "-1",
        }
    }

    /// Category-specific log file, if the category has one.
    pub fn log_file(&self) -> Option<&'static str> {
        match self {
            ErrorCategory::InvalidFormat | ErrorCategory::NotFound => Some("invalid-sra-log.tsv"),
            ErrorCategory::AccessDenied => Some("private-sra-log.tsv"),
            ErrorCategory::Oversize => Some("oversize-sra-log.tsv"),
            ErrorCategory::PreviouslyRetrieved => Some("previously-retrieved-error.tsv"),
            ErrorCategory::ValidationFailure => Some("validation-error-log.tsv"),
            ErrorCategory::Uncategorized => None,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::InvalidFormat => "invalid-format",
            ErrorCategory::AccessDenied => "access-denied",
            ErrorCategory::NotFound => "not-found",
            ErrorCategory::Oversize => "oversize",
            ErrorCategory::PreviouslyRetrieved => "previously-retrieved",
            ErrorCategory::ValidationFailure => "validation-failure",
            ErrorCategory::Uncategorized => "uncategorized",
        };
        write!(f, "{label}")
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_accession_keeps_case() {
        let acc: Accession = " srr123\n".parse().unwrap();
        assert_eq!(acc.as_str(), "srr123");
    }

    #[test]
    fn parse_accession_invalid() {
        let err = "ABC".parse::<Accession>().unwrap_err();
        assert_matches!(err, RetrieverError::InvalidAccession(_));
        assert!("DRR000001".parse::<Accession>().is_err());
        assert!("SRR".parse::<Accession>().is_err());
        assert!("SRR12a".parse::<Accession>().is_err());
    }

    #[test]
    fn parse_max_size() {
        let size: MaxSize = "70g".parse().unwrap();
        assert_eq!(size.as_str(), "70G");
        assert_eq!("500".parse::<MaxSize>().unwrap().as_str(), "500");
        assert_matches!(
            "seventy".parse::<MaxSize>(),
            Err(RetrieverError::InvalidMaxSize(_))
        );
    }

    #[test]
    fn category_files() {
        assert_eq!(
            ErrorCategory::InvalidFormat.log_file(),
            ErrorCategory::NotFound.log_file()
        );
        assert_eq!(ErrorCategory::AccessDenied.code(), "403");
        assert_eq!(ErrorCategory::Uncategorized.log_file(), None);
    }

    #[test]
    fn split_mode_names() {
        let mode: SplitMode = serde_json::from_str("\"split-3\"").unwrap();
        assert_eq!(mode, SplitMode::Split3);
        let mode: SplitMode = serde_json::from_str("\"split-files\"").unwrap();
        assert_eq!(mode.flag(), "--split-files");
        assert_eq!(
            <SplitMode as ValueEnum>::from_str("split-3", true).unwrap(),
            SplitMode::Split3
        );
    }
}
