use std::collections::HashSet;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify;
use crate::domain::{Accession, ErrorCategory, MaxSize, SplitMode};
use crate::error::RetrieverError;
use crate::fs_util;
use crate::history::RetrievalHistory;
use crate::identifiers::{IdentifierTable, partition_accessions};
use crate::logger::ErrorLog;
use crate::toolkit::{ToolOutput, ToolkitRunner};
use crate::workspace::Workspace;

pub const INCORRECT_FORMATTING: &str = "Incorrect Formatting";

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub verify_input: bool,
    pub validate_data: bool,
    pub max_size: MaxSize,
    pub split: SplitMode,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            verify_input: true,
            validate_data: true,
            max_size: MaxSize::default(),
            split: SplitMode::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Verify,
    Download,
    Validate,
    Cleanup,
}

impl Stage {
    pub fn label(&self) -> &'static str {
        match self {
            Stage::Verify => "Verifying SRA Numbers",
            Stage::Download => "Downloading SRA Data",
            Stage::Validate => "Validating SRA Data",
            Stage::Cleanup => "Cleaning Up Redundant Files",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub current: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub stage: Stage,
    pub message: String,
    pub position: Option<Position>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Per-run classification state. A fresh context is built for every run.
#[derive(Debug, Default)]
pub struct RunContext {
    past: HashSet<String>,
    access_denied: HashSet<Accession>,
    not_found: HashSet<Accession>,
    oversize: HashSet<Accession>,
    previously_retrieved: HashSet<Accession>,
    aborted: HashSet<Accession>,
    converted: Vec<Accession>,
    rejected: Vec<String>,
    cleanup_failures: Vec<Accession>,
    log_entries: usize,
}

impl RunContext {
    pub fn new(past: impl IntoIterator<Item = String>) -> Self {
        Self {
            past: past.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn mark(&mut self, accession: &Accession, category: ErrorCategory) {
        let set = match category {
            ErrorCategory::AccessDenied => &mut self.access_denied,
            ErrorCategory::NotFound => &mut self.not_found,
            ErrorCategory::Oversize => &mut self.oversize,
            ErrorCategory::PreviouslyRetrieved => &mut self.previously_retrieved,
            _ => &mut self.aborted,
        };
        set.insert(accession.clone());
    }

    /// Classification recorded before validation, highest priority first.
    pub fn prior_category(&self, accession: &Accession) -> Option<ErrorCategory> {
        if self.access_denied.contains(accession) {
            Some(ErrorCategory::AccessDenied)
        } else if self.not_found.contains(accession) {
            Some(ErrorCategory::NotFound)
        } else if self.oversize.contains(accession) {
            Some(ErrorCategory::Oversize)
        } else if self.previously_retrieved.contains(accession) {
            Some(ErrorCategory::PreviouslyRetrieved)
        } else {
            None
        }
    }

    pub fn is_aborted(&self, accession: &Accession) -> bool {
        self.aborted.contains(accession)
    }

    pub fn converted(&self) -> &[Accession] {
        &self.converted
    }

    pub fn log_entries(&self) -> usize {
        self.log_entries
    }
}

/// Reason logged for a validation failure of an accession classified earlier.
pub fn validation_reason(category: ErrorCategory) -> Option<&'static str> {
    match category {
        ErrorCategory::AccessDenied => Some("Project is private: Access Denied (403)"),
        ErrorCategory::NotFound => Some("Incorrect SRA: failed to resolve accession (404)"),
        ErrorCategory::Oversize => Some("SRA size exceeds the maximum allowed size (1101)"),
        ErrorCategory::PreviouslyRetrieved => Some("SRA has been retrieved previously (1102)"),
        _ => None,
    }
}

/// Reason logged by cleanup for accessions skipped during download.
pub fn cleanup_reason(category: ErrorCategory) -> Option<&'static str> {
    match category {
        ErrorCategory::AccessDenied => Some("Incorrect SRA: access denied (403)"),
        ErrorCategory::NotFound => Some("Incorrect SRA: failed to resolve accession (404)"),
        ErrorCategory::Oversize => Some("SRA exceeds the maximum allowed size (1101)"),
        ErrorCategory::PreviouslyRetrieved => Some("SRA has been retrieved previously (1102)"),
        _ => None,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub accepted: Vec<String>,
    pub rejected: Vec<String>,
    pub access_denied: Vec<String>,
    pub not_found: Vec<String>,
    pub oversize: Vec<String>,
    pub previously_retrieved: Vec<String>,
    pub aborted: Vec<String>,
    pub converted: Vec<String>,
    pub cleanup_failures: Vec<String>,
    pub validation_passed: Option<bool>,
    pub log_entries: usize,
    pub elapsed_seconds: f64,
}

impl RunReport {
    fn build(
        accepted: &[Accession],
        ctx: &RunContext,
        validation_passed: Option<bool>,
        elapsed: Duration,
    ) -> Self {
        let select = |set: &HashSet<Accession>| {
            accepted
                .iter()
                .filter(|acc| set.contains(*acc))
                .map(|acc| acc.to_string())
                .collect::<Vec<_>>()
        };
        let names = |list: &[Accession]| {
            list.iter()
                .map(|acc| acc.to_string())
                .collect::<Vec<String>>()
        };
        Self {
            accepted: names(accepted),
            rejected: ctx.rejected.clone(),
            access_denied: select(&ctx.access_denied),
            not_found: select(&ctx.not_found),
            oversize: select(&ctx.oversize),
            previously_retrieved: select(&ctx.previously_retrieved),
            aborted: select(&ctx.aborted),
            converted: names(ctx.converted.as_slice()),
            cleanup_failures: names(ctx.cleanup_failures.as_slice()),
            validation_passed,
            log_entries: ctx.log_entries,
            elapsed_seconds: (elapsed.as_secs_f64() * 100.0).round() / 100.0,
        }
    }
}

pub struct Retriever<T: ToolkitRunner, H: RetrievalHistory> {
    workspace: Workspace,
    toolkit: T,
    history: H,
    log: ErrorLog,
}

impl<T: ToolkitRunner, H: RetrievalHistory> Retriever<T, H> {
    pub fn new(workspace: Workspace, toolkit: T, history: H, error_log_name: &str) -> Self {
        let log = ErrorLog::new(workspace.log_root().to_path_buf(), error_log_name);
        Self {
            workspace,
            toolkit,
            history,
            log,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }

    /// Verifies, downloads, optionally validates, and cleans up every
    /// accession of `table`, in table order.
    pub fn run(
        &self,
        table: &IdentifierTable,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunReport, RetrieverError> {
        let started = Instant::now();
        self.workspace.ensure_roots()?;
        let mut ctx = RunContext::new(self.history.previously_retrieved()?);

        let accepted = if options.verify_input {
            self.verify_format(table, table.accessions(), &mut ctx, sink)
        } else {
            table
                .accessions()
                .iter()
                .filter(|raw| !raw.trim().is_empty())
                .map(|raw| Accession::unchecked(raw))
                .collect()
        };

        self.download(table, &accepted, options, &mut ctx, sink);

        let validation_passed = if options.validate_data {
            Some(self.validate(table, &accepted, &mut ctx, sink))
        } else {
            None
        };

        self.cleanup(table, &accepted, &mut ctx, sink);

        let report = RunReport::build(&accepted, &ctx, validation_passed, started.elapsed());
        info!(
            "download completed [{} seconds]",
            report.elapsed_seconds
        );
        Ok(report)
    }

    /// Splits `raw` by accession format and logs every rejected entry once.
    pub fn verify_format<S: AsRef<str>>(
        &self,
        table: &IdentifierTable,
        raw: &[S],
        ctx: &mut RunContext,
        sink: &dyn ProgressSink,
    ) -> Vec<Accession> {
        let partition = partition_accessions(raw);
        for rejected in &partition.rejected {
            warn!("SRA number {rejected} is incorrect");
            self.log_failure(
                table,
                rejected,
                ErrorCategory::InvalidFormat,
                INCORRECT_FORMATTING,
                ctx,
            );
        }
        sink.event(ProgressEvent {
            stage: Stage::Verify,
            message: format!(
                "{} accepted, {} rejected",
                partition.accepted.len(),
                partition.rejected.len()
            ),
            position: None,
        });
        ctx.rejected.extend(partition.rejected);
        partition.accepted
    }

    pub fn download(
        &self,
        table: &IdentifierTable,
        accepted: &[Accession],
        options: &RunOptions,
        ctx: &mut RunContext,
        sink: &dyn ProgressSink,
    ) {
        let total = accepted.len();
        for (index, accession) in accepted.iter().enumerate() {
            sink.event(ProgressEvent {
                stage: Stage::Download,
                message: accession.to_string(),
                position: Some(Position {
                    current: index,
                    total,
                }),
            });
            if let Err(err) = self.download_one(accession, options, ctx) {
                warn!("{accession}: {err}");
                ctx.mark(accession, ErrorCategory::Uncategorized);
                self.log_failure(
                    table,
                    accession.as_str(),
                    ErrorCategory::Uncategorized,
                    &err.to_string(),
                    ctx,
                );
            }
        }
        sink.event(ProgressEvent {
            stage: Stage::Download,
            message: format!("{} converted", ctx.converted.len()),
            position: Some(Position {
                current: total,
                total,
            }),
        });
    }

    fn download_one(
        &self,
        accession: &Accession,
        options: &RunOptions,
        ctx: &mut RunContext,
    ) -> Result<(), RetrieverError> {
        if ctx.past.contains(accession.as_str()) {
            info!("{accession} has been retrieved previously (1102)");
            ctx.mark(accession, ErrorCategory::PreviouslyRetrieved);
            return Ok(());
        }

        let info = self.toolkit.dump_info(accession)?;
        match classify::classify_precheck(&info.text) {
            Some(ErrorCategory::AccessDenied) => {
                warn!("access denied for {accession} (403)");
                ctx.mark(accession, ErrorCategory::AccessDenied);
                return Ok(());
            }
            Some(ErrorCategory::NotFound) => {
                warn!("failed to resolve accession number {accession} (404)");
                ctx.mark(accession, ErrorCategory::NotFound);
                return Ok(());
            }
            _ => {
                for line in info.text.lines() {
                    debug!("{line}");
                }
            }
        }

        let work_root = self.workspace.work_root().as_std_path();
        let fetched = self
            .toolkit
            .prefetch(accession, &options.max_size, work_root)?;
        let oversize = classify::classify_prefetch(&fetched.text).is_some();
        if oversize || !self.workspace.has_download(accession) {
            warn!(
                "{accession} was not downloaded, size may exceed {} (1101)",
                options.max_size
            );
            ctx.mark(accession, ErrorCategory::Oversize);
            return Ok(());
        }

        info!("converting {accession}.sra to {accession}.fastq");
        let sra_file = self.workspace.sra_file(accession);
        let reads_dir = self.workspace.reads_dir(accession);
        let converted = self.toolkit.convert(
            sra_file.as_std_path(),
            options.split,
            reads_dir.as_std_path(),
        )?;
        if !converted.success {
            warn!("fasterq-dump reported a failure for {accession}");
        }
        ctx.converted.push(accession.clone());
        Ok(())
    }

    /// Runs `vdb-validate` on every accession. Returns false when any
    /// accession produced a line outside the known-good patterns.
    pub fn validate(
        &self,
        table: &IdentifierTable,
        accepted: &[Accession],
        ctx: &mut RunContext,
        sink: &dyn ProgressSink,
    ) -> bool {
        let mut all_valid = true;
        let total = accepted.len();
        let work_root = self.workspace.work_root().as_std_path();

        for (index, accession) in accepted.iter().enumerate() {
            sink.event(ProgressEvent {
                stage: Stage::Validate,
                message: accession.to_string(),
                position: Some(Position {
                    current: index,
                    total,
                }),
            });

            let output = self
                .toolkit
                .validate(accession, work_root)
                .unwrap_or_else(|err| ToolOutput::failed(err.to_string()));
            let Some(reason) = resolve_validation_failure(accession, &output.text, ctx) else {
                continue;
            };

            all_valid = false;
            match ctx.prior_category(accession) {
                Some(_) => warn!("data {accession} validation failed. Error: {reason}"),
                None => warn!("error not caught: data {accession} validation failed. Error: {reason}"),
            }
            self.log_failure(
                table,
                accession.as_str(),
                ErrorCategory::ValidationFailure,
                &reason,
                ctx,
            );
        }

        sink.event(ProgressEvent {
            stage: Stage::Validate,
            message: if all_valid {
                "all data valid".to_string()
            } else {
                "validation failures logged".to_string()
            },
            position: Some(Position {
                current: total,
                total,
            }),
        });
        all_valid
    }

    /// Deletes intermediate downloads and logs every accession skipped
    /// during download under its category.
    pub fn cleanup(
        &self,
        table: &IdentifierTable,
        accepted: &[Accession],
        ctx: &mut RunContext,
        sink: &dyn ProgressSink,
    ) {
        let total = accepted.len();
        for (index, accession) in accepted.iter().enumerate() {
            sink.event(ProgressEvent {
                stage: Stage::Cleanup,
                message: accession.to_string(),
                position: Some(Position {
                    current: index,
                    total,
                }),
            });
            if ctx.prior_category(accession).is_some() || ctx.is_aborted(accession) {
                continue;
            }
            let sra_file = self.workspace.sra_file(accession);
            let sra_dir = self.workspace.sra_dir(accession);
            if let Err(err) = fs_util::remove_download(&sra_file, &sra_dir) {
                debug!("{err}");
                warn!("removal for {accession}.sra failed");
                ctx.cleanup_failures.push(accession.clone());
                self.log_failure(
                    table,
                    accession.as_str(),
                    ErrorCategory::Uncategorized,
                    &format!(
                        "{accession}.sra and/or the folder containing this file failed to be removed."
                    ),
                    ctx,
                );
            }
        }

        for category in [
            ErrorCategory::AccessDenied,
            ErrorCategory::NotFound,
            ErrorCategory::Oversize,
            ErrorCategory::PreviouslyRetrieved,
        ] {
            let Some(reason) = cleanup_reason(category) else {
                continue;
            };
            let matching: Vec<&Accession> = accepted
                .iter()
                .filter(|acc| ctx.prior_category(acc) == Some(category))
                .collect();
            for accession in matching {
                if category != ErrorCategory::PreviouslyRetrieved {
                    let reads_dir = self.workspace.reads_dir(accession);
                    if let Err(err) = fs_util::remove_empty_dir(&reads_dir) {
                        debug!("could not remove {reads_dir}: {err}");
                    }
                }
                self.log_failure(table, accession.as_str(), category, reason, ctx);
            }
        }

        sink.event(ProgressEvent {
            stage: Stage::Cleanup,
            message: format!("{} removal failures", ctx.cleanup_failures.len()),
            position: Some(Position {
                current: total,
                total,
            }),
        });
    }

    fn log_failure(
        &self,
        table: &IdentifierTable,
        accession: &str,
        category: ErrorCategory,
        reason: &str,
        ctx: &mut RunContext,
    ) {
        match self.log.record(table, accession, category, reason) {
            Ok(_) => ctx.log_entries += 1,
            Err(err) => warn!("{err}"),
        }
    }
}

/// Reason to log when `output` holds a failing line for `accession`, or
/// `None` when every line is known-good.
pub fn resolve_validation_failure(
    accession: &Accession,
    output: &str,
    ctx: &RunContext,
) -> Option<String> {
    let first_failure = classify::failing_lines(output).into_iter().next()?;
    let reason = ctx
        .prior_category(accession)
        .and_then(validation_reason)
        .map(str::to_string)
        .unwrap_or_else(|| first_failure.trim().to_string());
    Some(reason)
}
