use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Serialize;
use tracing::debug;

use crate::domain::{Accession, MaxSize, SplitMode};
use crate::error::RetrieverError;

#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub vdb_dump: Option<String>,
    pub prefetch: Option<String>,
    pub fasterq_dump: Option<String>,
    pub vdb_validate: Option<String>,
}

/// Captured result of one toolkit invocation; stdout and stderr are merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub success: bool,
    pub text: String,
}

impl ToolOutput {
    pub fn ok(text: impl Into<String>) -> Self {
        Self {
            success: true,
            text: text.into(),
        }
    }

    pub fn failed(text: impl Into<String>) -> Self {
        Self {
            success: false,
            text: text.into(),
        }
    }
}

/// The four SRA Toolkit operations the retriever drives.
pub trait ToolkitRunner {
    /// `vdb-dump --info`, used as a reachability pre-check.
    fn dump_info(&self, accession: &Accession) -> Result<ToolOutput, RetrieverError>;

    /// `prefetch` into `work_dir`, bounded by `max_size`.
    fn prefetch(
        &self,
        accession: &Accession,
        max_size: &MaxSize,
        work_dir: &Path,
    ) -> Result<ToolOutput, RetrieverError>;

    /// `fasterq-dump` of `sra_file` into `out_dir`.
    fn convert(
        &self,
        sra_file: &Path,
        split: SplitMode,
        out_dir: &Path,
    ) -> Result<ToolOutput, RetrieverError>;

    /// `vdb-validate`, run from `work_dir` so the local copy is checked.
    fn validate(&self, accession: &Accession, work_dir: &Path)
    -> Result<ToolOutput, RetrieverError>;

    fn tool_info(&self) -> ToolInfo;
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { message: String },
}

#[derive(Debug, Clone)]
pub struct SystemToolkit {
    vdb_dump: Option<PathBuf>,
    prefetch: Option<PathBuf>,
    fasterq_dump: Option<PathBuf>,
    vdb_validate: Option<PathBuf>,
}

impl SystemToolkit {
    /// Looks the binaries up in `toolkit_dir` first, then on `PATH`.
    pub fn new(toolkit_dir: Option<&Path>) -> Self {
        let locate = |name: &str| {
            toolkit_dir
                .and_then(|dir| find_in_dir(dir, name))
                .or_else(|| find_in_path(name))
        };
        Self {
            vdb_dump: locate("vdb-dump"),
            prefetch: locate("prefetch"),
            fasterq_dump: locate("fasterq-dump"),
            vdb_validate: locate("vdb-validate"),
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        let missing = [
            ("vdb-dump", &self.vdb_dump),
            ("prefetch", &self.prefetch),
            ("fasterq-dump", &self.fasterq_dump),
            ("vdb-validate", &self.vdb_validate),
        ]
        .into_iter()
        .filter(|(_, path)| path.is_none())
        .map(|(name, _)| name)
        .collect::<Vec<_>>();

        if missing.is_empty() {
            ToolStatus::Ready
        } else {
            ToolStatus::Missing {
                message: format!("missing {} (SRA Toolkit)", missing.join(", ")),
            }
        }
    }

    fn require<'a>(tool: &'a Option<PathBuf>, name: &str) -> Result<&'a PathBuf, RetrieverError> {
        tool.as_ref()
            .ok_or_else(|| RetrieverError::MissingTool(name.to_string()))
    }

    fn run_cmd(
        &self,
        program: &Path,
        args: &[String],
        cwd: Option<&Path>,
    ) -> Result<ToolOutput, RetrieverError> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        debug!("running {} {}", program.display(), args.join(" "));
        let output = cmd.output().map_err(|err| RetrieverError::Toolkit {
            program: program.display().to_string(),
            message: err.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut text = stdout.trim_end().to_string();
        if !stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(stderr.trim_end());
        }
        Ok(ToolOutput {
            success: output.status.success(),
            text,
        })
    }
}

impl ToolkitRunner for SystemToolkit {
    fn dump_info(&self, accession: &Accession) -> Result<ToolOutput, RetrieverError> {
        let vdb_dump = Self::require(&self.vdb_dump, "vdb-dump")?;
        let args = vec!["--info".to_string(), accession.as_str().to_string()];
        self.run_cmd(vdb_dump, &args, None)
    }

    fn prefetch(
        &self,
        accession: &Accession,
        max_size: &MaxSize,
        work_dir: &Path,
    ) -> Result<ToolOutput, RetrieverError> {
        let prefetch = Self::require(&self.prefetch, "prefetch")?;
        let args = vec![
            "-p".to_string(),
            accession.as_str().to_string(),
            "-X".to_string(),
            max_size.as_str().to_string(),
        ];
        self.run_cmd(prefetch, &args, Some(work_dir))
    }

    fn convert(
        &self,
        sra_file: &Path,
        split: SplitMode,
        out_dir: &Path,
    ) -> Result<ToolOutput, RetrieverError> {
        let fasterq = Self::require(&self.fasterq_dump, "fasterq-dump")?;
        let args = vec![
            split.flag().to_string(),
            "-O".to_string(),
            out_dir.to_string_lossy().to_string(),
            sra_file.to_string_lossy().to_string(),
            "-p".to_string(),
        ];
        self.run_cmd(fasterq, &args, None)
    }

    fn validate(
        &self,
        accession: &Accession,
        work_dir: &Path,
    ) -> Result<ToolOutput, RetrieverError> {
        let vdb_validate = Self::require(&self.vdb_validate, "vdb-validate")?;
        let args = vec![accession.as_str().to_string()];
        self.run_cmd(vdb_validate, &args, Some(work_dir))
    }

    fn tool_info(&self) -> ToolInfo {
        let version = |tool: &Option<PathBuf>| {
            tool.as_ref()
                .and_then(|path| tool_version(path, &["--version"]))
        };
        ToolInfo {
            vdb_dump: version(&self.vdb_dump),
            prefetch: version(&self.prefetch),
            fasterq_dump: version(&self.fasterq_dump),
            vdb_validate: version(&self.vdb_validate),
        }
    }
}

fn find_in_dir(dir: &Path, name: &str) -> Option<PathBuf> {
    let exe = dir.join(format!("{name}.exe"));
    if exe.exists() {
        return Some(exe);
    }
    let plain = dir.join(name);
    plain.exists().then_some(plain)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| find_in_dir(&dir, name))
}

fn tool_version(path: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new(path).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if stdout.is_empty() {
        None
    } else {
        Some(stdout)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn missing_tools_are_reported() {
        let temp = tempfile::tempdir().unwrap();
        let toolkit = SystemToolkit {
            vdb_dump: None,
            prefetch: Some(temp.path().join("prefetch")),
            fasterq_dump: None,
            vdb_validate: Some(temp.path().join("vdb-validate")),
        };
        assert_matches!(
            toolkit.tool_status(),
            ToolStatus::Missing { message } if message.contains("vdb-dump, fasterq-dump")
        );

        let acc: Accession = "SRR1".parse().unwrap();
        assert_matches!(
            toolkit.dump_info(&acc),
            Err(RetrieverError::MissingTool(name)) if name == "vdb-dump"
        );
    }

    #[test]
    fn finds_binary_in_toolkit_dir() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("vdb-dump"), b"").unwrap();
        assert_eq!(
            find_in_dir(temp.path(), "vdb-dump"),
            Some(temp.path().join("vdb-dump"))
        );
        assert_eq!(find_in_dir(temp.path(), "prefetch"), None);
    }
}
