use std::fs;

use camino::Utf8PathBuf;
use tracing::info;

use crate::assembler::{AssemblerConfig, StageValues};
use crate::domain::{Database, RunAccession};
use crate::entrez;
use crate::error::QandaError;
use crate::process::{self, Invoker};
use crate::workspace::Workspace;

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub queries: Vec<String>,
    pub database: Database,
    pub assembler: String,
    pub config_dir: Utf8PathBuf,
    pub cores: u32,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub runinfo: Utf8PathBuf,
    pub assemblies: Vec<AssemblyOutcome>,
}

#[derive(Debug, Clone)]
pub struct AssemblyOutcome {
    pub accession: RunAccession,
    pub output_dir: Utf8PathBuf,
}

pub struct App<I: Invoker> {
    workspace: Workspace,
    invoker: I,
}

impl<I: Invoker> App<I> {
    pub fn new(workspace: Workspace, invoker: I) -> Self {
        Self { workspace, invoker }
    }

    /// Layout, configuration, metadata resolution, then per-accession
    /// download and assembly. Every step is fatal on failure.
    pub fn run(&self, options: &RunOptions) -> Result<RunSummary, QandaError> {
        self.workspace.ensure_layout()?;

        let config = AssemblerConfig::load(&options.config_dir, &options.assembler)?;

        info!(
            "resolving {} query(ies) against {}",
            options.queries.len(),
            options.database
        );
        let mut biosamples = self.workspace.open_biosample_log()?;
        let table = entrez::resolve_queries(
            &self.invoker,
            &options.queries,
            &options.database,
            &mut biosamples,
        )?;
        let runinfo_path = self.workspace.runinfo_path();
        table.write_csv(&runinfo_path)?;
        info!("wrote {} run(s) to {runinfo_path}", table.len());

        let accessions = table.accessions()?;

        for accession in &accessions {
            self.download_reads(accession)?;
        }

        let mut assemblies = Vec::with_capacity(accessions.len());
        for accession in &accessions {
            assemblies.push(self.assemble(accession, &config, options.cores)?);
        }

        Ok(RunSummary {
            runinfo: runinfo_path,
            assemblies,
        })
    }

    fn download_reads(&self, accession: &RunAccession) -> Result<(), QandaError> {
        info!("downloading reads for {accession}");
        let argv = [
            "fastq-dump".to_string(),
            "--outdir".to_string(),
            self.workspace.reads_dir().to_string(),
            "--gzip".to_string(),
            "--skip-technical".to_string(),
            "--readids".to_string(),
            "--read-filter".to_string(),
            "pass".to_string(),
            "--dumpbase".to_string(),
            "--split-files".to_string(),
            "--clip".to_string(),
            accession.to_string(),
        ];
        self.invoker
            .run(&format!("download of {accession}"), &argv, None)?;
        Ok(())
    }

    fn assemble(
        &self,
        accession: &RunAccession,
        config: &AssemblerConfig,
        cores: u32,
    ) -> Result<AssemblyOutcome, QandaError> {
        let output_dir = self.workspace.assembly_dir(accession);
        fs::create_dir_all(output_dir.as_std_path())
            .map_err(|err| QandaError::Filesystem(err.to_string()))?;

        let values = StageValues {
            acc: accession.to_string(),
            fwd: self.workspace.forward_read(accession),
            rev: self.workspace.reverse_read(accession),
            outdir: output_dir.clone(),
            cores,
        };

        info!("assembling {accession} with {}", config.name());
        for (stage, command) in config.substitute(&values)? {
            let label = format!("{stage} stage for {accession}");
            let argv = process::split_command(&label, &command)?;
            self.invoker.run(&label, &argv, None)?;
        }

        Ok(AssemblyOutcome {
            accession: accession.clone(),
            output_dir,
        })
    }
}
