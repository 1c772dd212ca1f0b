use std::fs;

use camino::{Utf8Path, Utf8PathBuf};

use crate::config::ResolvedConfig;
use crate::domain::Accession;
use crate::error::RetrieverError;

/// Directory layout of a run: prefetch downloads, converted reads, and logs.
#[derive(Debug, Clone)]
pub struct Workspace {
    work_root: Utf8PathBuf,
    output_root: Utf8PathBuf,
    log_root: Utf8PathBuf,
}

impl Workspace {
    pub fn from_config(config: &ResolvedConfig) -> Self {
        Self::new_with_paths(
            config.work_dir.clone(),
            config.output_dir.clone(),
            config.log_dir.clone(),
        )
    }

    pub fn new_with_paths(
        work_root: Utf8PathBuf,
        output_root: Utf8PathBuf,
        log_root: Utf8PathBuf,
    ) -> Self {
        Self {
            work_root,
            output_root,
            log_root,
        }
    }

    pub fn work_root(&self) -> &Utf8Path {
        &self.work_root
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn log_root(&self) -> &Utf8Path {
        &self.log_root
    }

    /// Directory `prefetch` creates for a run.
    pub fn sra_dir(&self, accession: &Accession) -> Utf8PathBuf {
        self.work_root.join(accession.as_str())
    }

    pub fn sra_file(&self, accession: &Accession) -> Utf8PathBuf {
        self.sra_dir(accession)
            .join(format!("{}.sra", accession.as_str()))
    }

    /// Where `fasterq-dump` writes the reads of a run.
    pub fn reads_dir(&self, accession: &Accession) -> Utf8PathBuf {
        self.output_root.join(accession.as_str())
    }

    pub fn log_path(&self, name: &str) -> Utf8PathBuf {
        self.log_root.join(name)
    }

    pub fn ensure_roots(&self) -> Result<(), RetrieverError> {
        for root in [&self.work_root, &self.output_root, &self.log_root] {
            fs::create_dir_all(root.as_std_path())
                .map_err(|err| RetrieverError::Filesystem(format!("{root}: {err}")))?;
        }
        Ok(())
    }

    pub fn has_download(&self, accession: &Accession) -> bool {
        self.sra_dir(accession).as_std_path().exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let workspace = Workspace::new_with_paths(
            Utf8PathBuf::from("work"),
            Utf8PathBuf::from("raw_sequence_data"),
            Utf8PathBuf::from("SRA-Numbers"),
        );
        let acc: Accession = "SRR1568808".parse().unwrap();

        assert_eq!(workspace.sra_file(&acc), "work/SRR1568808/SRR1568808.sra");
        assert_eq!(workspace.reads_dir(&acc), "raw_sequence_data/SRR1568808");
        assert_eq!(workspace.log_path("sra-log"), "SRA-Numbers/sra-log");
    }
}
