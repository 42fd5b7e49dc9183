use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::domain::RunAccession;
use crate::error::QandaError;

/// Results directory layout:
/// `runinfo.csv`, `fastqs/`, `assemblies/<accession>/`,
/// `biosamples/biosamples.txt`.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn runinfo_path(&self) -> Utf8PathBuf {
        self.root.join("runinfo.csv")
    }

    pub fn reads_dir(&self) -> Utf8PathBuf {
        self.root.join("fastqs")
    }

    pub fn assemblies_dir(&self) -> Utf8PathBuf {
        self.root.join("assemblies")
    }

    pub fn assembly_dir(&self, accession: &RunAccession) -> Utf8PathBuf {
        self.assemblies_dir().join(accession.as_str())
    }

    pub fn biosamples_dir(&self) -> Utf8PathBuf {
        self.root.join("biosamples")
    }

    pub fn biosample_path(&self) -> Utf8PathBuf {
        self.biosamples_dir().join("biosamples.txt")
    }

    pub fn forward_read(&self, accession: &RunAccession) -> Utf8PathBuf {
        self.reads_dir()
            .join(format!("{accession}_pass_1.fastq.gz"))
    }

    pub fn reverse_read(&self, accession: &RunAccession) -> Utf8PathBuf {
        self.reads_dir()
            .join(format!("{accession}_pass_2.fastq.gz"))
    }

    pub fn ensure_layout(&self) -> Result<(), QandaError> {
        for dir in [self.reads_dir(), self.assemblies_dir(), self.biosamples_dir()] {
            fs::create_dir_all(dir.as_std_path())
                .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }

    /// One writer per pipeline run; the log is never truncated.
    pub fn open_biosample_log(&self) -> Result<BiosampleWriter, QandaError> {
        let path = self.biosample_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        }
        let file = fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(path.as_std_path())
            .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        Ok(BiosampleWriter { file })
    }
}

pub struct BiosampleWriter {
    file: fs::File,
}

impl BiosampleWriter {
    pub fn append(&mut self, record: &[u8]) -> Result<(), QandaError> {
        self.file
            .write_all(record)
            .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        // keep records line-separated
        if !record.is_empty() && !record.ends_with(b"\n") {
            self.file
                .write_all(b"\n")
                .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        }
        Ok(())
    }
}
