use std::io::{self, Write};
use std::sync::Mutex;

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunReport, Stage};
use crate::identifiers::Partition;
use crate::toolkit::ToolInfo;

#[derive(Debug, Clone, Copy)]
pub enum OutputMode {
    Interactive,
    NonInteractive,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(report: &RunReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_tools(info: &ToolInfo) -> io::Result<()> {
        Self::print_json(info)
    }

    pub fn print_check(partition: &Partition) -> io::Result<()> {
        #[derive(Serialize)]
        struct CheckResult<'a> {
            accepted: Vec<&'a str>,
            rejected: &'a [String],
        }
        Self::print_json(&CheckResult {
            accepted: partition.accepted.iter().map(|acc| acc.as_str()).collect(),
            rejected: &partition.rejected,
        })
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}

/// One progress bar per stage on stderr.
#[derive(Default)]
pub struct ConsoleProgress {
    active: Mutex<Option<(Stage, ProgressBar)>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn bar_for(stage: Stage, total: usize) -> ProgressBar {
        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{prefix}: [{bar:50.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        bar.set_prefix(stage.label());
        bar
    }

    pub fn finish(&self) {
        if let Ok(mut guard) = self.active.lock() {
            if let Some((_, bar)) = guard.take() {
                bar.finish();
            }
        }
    }
}

impl ProgressSink for ConsoleProgress {
    fn event(&self, event: ProgressEvent) {
        let Ok(mut guard) = self.active.lock() else {
            return;
        };
        let Some(position) = event.position else {
            match guard.as_ref() {
                Some((_, bar)) => bar.println(format!("{}: {}", event.stage.label(), event.message)),
                None => eprintln!("{}: {}", event.stage.label(), event.message),
            }
            return;
        };

        let same_stage = matches!(guard.as_ref(), Some((stage, _)) if *stage == event.stage);
        if !same_stage {
            if let Some((_, bar)) = guard.take() {
                bar.finish();
            }
            *guard = Some((event.stage, Self::bar_for(event.stage, position.total)));
        }

        if let Some((_, bar)) = guard.as_ref() {
            bar.set_position(position.current as u64);
            bar.set_message(event.message);
            if position.current >= position.total {
                bar.finish();
            }
        }
    }
}

pub fn print_summary(report: &RunReport) {
    let green = "\x1b[32m";
    let yellow = "\x1b[33m";
    let cyan = "\x1b[36m";
    let red = "\x1b[31m";
    let reset = "\x1b[0m";

    println!("{cyan}SRA retrieval summary{reset}");
    println!("{green}Converted: {}{reset}", report.converted.len());
    let skipped = [
        ("Incorrect formatting", &report.rejected),
        ("Access denied (403)", &report.access_denied),
        ("Failed to resolve (404)", &report.not_found),
        ("Oversize (1101)", &report.oversize),
        ("Retrieved previously (1102)", &report.previously_retrieved),
        ("Aborted", &report.aborted),
        ("Removal failed", &report.cleanup_failures),
    ];
    for (label, items) in skipped {
        if !items.is_empty() {
            println!("{yellow}{label}: {}{reset}", items.join(", "));
        }
    }
    match report.validation_passed {
        Some(true) => println!("{green}Validation passed{reset}"),
        Some(false) => println!("{red}Validation failed, see validation-error-log.tsv{reset}"),
        None => {}
    }
    println!(
        "{cyan}Download Completed [{} seconds], {} error log entries{reset}",
        report.elapsed_seconds, report.log_entries
    );
}
