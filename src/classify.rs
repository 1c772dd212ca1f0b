//! Ordered pattern rules that turn captured toolkit text into outcomes.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::ErrorCategory;

/// A rule matches when every one of its patterns matches the inspected line.
#[derive(Debug)]
pub struct Rule {
    patterns: Vec<Regex>,
    pub category: ErrorCategory,
}

impl Rule {
    fn new(patterns: &[&str], category: ErrorCategory) -> Self {
        let patterns = patterns
            .iter()
            .map(|pattern| Regex::new(pattern).expect("classification pattern is valid"))
            .collect();
        Self { patterns, category }
    }

    pub fn matches(&self, line: &str) -> bool {
        self.patterns.iter().all(|pattern| pattern.is_match(line))
    }
}

/// Evaluates `rules` top to bottom and returns the first hit.
pub fn first_match(rules: &[Rule], line: &str) -> Option<ErrorCategory> {
    rules
        .iter()
        .find(|rule| rule.matches(line))
        .map(|rule| rule.category)
}

static PRECHECK_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            &[r"(?i) access denied ", r" 403 "],
            ErrorCategory::AccessDenied,
        ),
        Rule::new(
            &[r"(?i) failed to resolve accession ", r" 404 "],
            ErrorCategory::NotFound,
        ),
    ]
});

static PREFETCH_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![Rule::new(
        &[r"(?i)is larger than maximum allowed: skipped"],
        ErrorCategory::Oversize,
    )]
});

static KNOWN_GOOD: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"(?i)[a-z0-9] ok$", r"(?i) reads$", r"(?i)is consistent$"]
        .iter()
        .map(|pattern| Regex::new(pattern).expect("validation pattern is valid"))
        .collect()
});

/// Classifies `vdb-dump --info` output. Only the first non-blank line is inspected.
pub fn classify_precheck(output: &str) -> Option<ErrorCategory> {
    let first = output.trim().lines().next()?;
    first_match(&PRECHECK_RULES, first)
}

/// Classifies `prefetch` output. The size notice is reported on the second line.
pub fn classify_prefetch(output: &str) -> Option<ErrorCategory> {
    let second = output.trim().lines().nth(1)?;
    first_match(&PREFETCH_RULES, second)
}

pub fn is_known_good(line: &str) -> bool {
    KNOWN_GOOD.iter().any(|pattern| pattern.is_match(line))
}

/// Lines of `vdb-validate` output that match none of the known-good endings.
pub fn failing_lines(output: &str) -> Vec<&str> {
    output
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_known_good(line))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precheck_access_denied() {
        let output = "vdb-dump.2.11.0 err: Access denied while resolving - Access denied ( 403 )\n";
        assert_eq!(classify_precheck(output), Some(ErrorCategory::AccessDenied));
    }

    #[test]
    fn precheck_not_found() {
        let output = "vdb-dump.2.11.0 err: item not found while resolving - failed to resolve accession 'SRR0' - no data ( 404 )";
        assert_eq!(classify_precheck(output), Some(ErrorCategory::NotFound));
    }

    #[test]
    fn precheck_requires_both_patterns() {
        assert_eq!(classify_precheck(" Access denied but no code"), None);
        assert_eq!(classify_precheck("failed with ( 403 ) alone"), None);
        assert_eq!(classify_precheck(""), None);
    }

    #[test]
    fn precheck_looks_at_first_line_only() {
        let output = "acc    : SRR1\n x Access denied ( 403 )";
        assert_eq!(classify_precheck(output), None);
    }

    #[test]
    fn prefetch_oversize_on_second_line() {
        let output = "\n2023-01-01 prefetch.2.11.0: 1) 'SRR1'...\n2023-01-01 prefetch.2.11.0:  'SRR1' (80GB) is larger than maximum allowed: skipped\n";
        assert_eq!(classify_prefetch(output), Some(ErrorCategory::Oversize));
        assert_eq!(classify_prefetch("only one line"), None);
    }

    #[test]
    fn validation_lines() {
        let output = "info: Database 'SRR1.sra' metadata: md5 ok\ninfo: Column 'ALTREAD': checksums ok\ninfo: Database 'SRR1.sra' contains only unaligned reads\ninfo: Database 'database.sra' is consistent\n\n";
        assert!(failing_lines(output).is_empty());

        let output = "info: Database 'SRR1.sra' metadata: md5 ok\ndatabase.sra corrupted";
        assert_eq!(failing_lines(output), vec!["database.sra corrupted"]);
    }

    #[test]
    fn known_good_is_case_insensitive() {
        assert!(is_known_good("Column 'READ': checksums OK"));
        assert!(is_known_good("database.sra IS CONSISTENT"));
        assert!(!is_known_good(" ok"));
    }
}
