use std::collections::HashMap;

use camino::Utf8Path;
use tracing::{debug, info};

use crate::domain::{Database, RunAccession};
use crate::error::QandaError;
use crate::process::Invoker;
use crate::workspace::BiosampleWriter;

const RUN_COLUMN: &str = "Run";
const SRA_TARGET: &str = "sra";
const BIOSAMPLE_TARGET: &str = "biosample";

/// Merged run metadata, one row per sequencing run. Columns follow the
/// first-seen schema; rows from later queries that add columns extend the
/// header and earlier rows are padded with empty fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfoTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl RunInfoTable {
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<Self, QandaError> {
        let mut reader = csv::Reader::from_reader(bytes);
        let header = reader
            .headers()
            .map_err(|err| QandaError::RunInfo(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|err| QandaError::RunInfo(err.to_string()))?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self { header, rows })
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn extend(&mut self, other: RunInfoTable) {
        let RunInfoTable {
            header: other_header,
            rows: other_rows,
        } = other;

        if other_header == self.header {
            self.rows.extend(other_rows);
            return;
        }

        let mut index_of: HashMap<String, usize> = self
            .header
            .iter()
            .enumerate()
            .map(|(index, column)| (column.clone(), index))
            .collect();
        for column in &other_header {
            if !index_of.contains_key(column) {
                index_of.insert(column.clone(), self.header.len());
                self.header.push(column.clone());
            }
        }

        for row in &mut self.rows {
            row.resize(self.header.len(), String::new());
        }
        for row in other_rows {
            let mut aligned = vec![String::new(); self.header.len()];
            for (column, value) in other_header.iter().zip(row) {
                aligned[index_of[column]] = value;
            }
            self.rows.push(aligned);
        }
    }

    pub fn accessions(&self) -> Result<Vec<RunAccession>, QandaError> {
        let run_column = self
            .header
            .iter()
            .position(|column| column == RUN_COLUMN)
            .ok_or(QandaError::MissingRunColumn)?;
        self.rows
            .iter()
            .map(|row| row.get(run_column).map(String::as_str).unwrap_or("").parse())
            .collect()
    }

    pub fn write_csv(&self, path: &Utf8Path) -> Result<(), QandaError> {
        let mut writer = csv::Writer::from_path(path.as_std_path())
            .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        writer
            .write_record(&self.header)
            .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        for row in &self.rows {
            writer
                .write_record(row)
                .map_err(|err| QandaError::Filesystem(err.to_string()))?;
        }
        writer
            .flush()
            .map_err(|err| QandaError::Filesystem(err.to_string()))
    }
}

#[derive(Debug, Clone)]
pub struct QueryRecords {
    pub runinfo: RunInfoTable,
    pub biosample: Vec<u8>,
}

fn search<I: Invoker>(
    invoker: &I,
    query: &str,
    database: &Database,
) -> Result<Vec<u8>, QandaError> {
    let argv = [
        "esearch",
        "-db",
        database.as_str(),
        "-query",
        query,
    ]
    .map(str::to_string);
    invoker.run(&format!("search for '{query}'"), &argv, None)
}

fn link<I: Invoker>(
    invoker: &I,
    query: &str,
    target: &str,
    ids: &[u8],
) -> Result<Vec<u8>, QandaError> {
    let argv = ["elink", "-target", target].map(str::to_string);
    invoker.run(&format!("link of '{query}' into {target}"), &argv, Some(ids))
}

/// One search, then two independent conditional links off the same search
/// result: each link is skipped only when the search database already is
/// the link target.
pub fn resolve_query<I: Invoker>(
    invoker: &I,
    query: &str,
    database: &Database,
) -> Result<QueryRecords, QandaError> {
    debug!("searching {database} for '{query}'");
    let hits = search(invoker, query, database)?;

    let run_ids = if database.is_sra() {
        hits.clone()
    } else {
        link(invoker, query, SRA_TARGET, &hits)?
    };
    let runinfo_bytes = invoker.run(
        &format!("run info fetch for '{query}'"),
        &["efetch", "-format", "runinfo"].map(str::to_string),
        Some(run_ids.as_slice()),
    )?;
    let runinfo = RunInfoTable::from_csv_bytes(&runinfo_bytes)?;
    if runinfo.is_empty() {
        return Err(QandaError::EmptyResult(query.to_string()));
    }

    let sample_ids = if database.is_biosample() {
        hits
    } else {
        link(invoker, query, BIOSAMPLE_TARGET, &hits)?
    };
    let biosample = invoker.run(
        &format!("biosample fetch for '{query}'"),
        &["efetch", "-format", "native"].map(str::to_string),
        Some(sample_ids.as_slice()),
    )?;

    Ok(QueryRecords { runinfo, biosample })
}

pub fn resolve_queries<I: Invoker>(
    invoker: &I,
    queries: &[String],
    database: &Database,
    biosamples: &mut BiosampleWriter,
) -> Result<RunInfoTable, QandaError> {
    if queries.is_empty() {
        return Err(QandaError::NoQueries);
    }

    let mut merged: Option<RunInfoTable> = None;
    for query in queries {
        let records = resolve_query(invoker, query, database)?;
        info!(
            "query '{query}' resolved to {} sequencing run(s)",
            records.runinfo.len()
        );
        biosamples.append(&records.biosample)?;
        match merged.as_mut() {
            Some(table) => table.extend(records.runinfo),
            None => merged = Some(records.runinfo),
        }
    }

    merged.ok_or(QandaError::NoQueries)
}
