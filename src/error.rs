use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum QandaError {
    #[error("no queries given, nothing to resolve")]
    NoQueries,

    #[error("invalid database name: {0}")]
    InvalidDatabase(String),

    #[error("invalid run accession: {0}")]
    InvalidRunAccession(String),

    #[error("invalid assembler name: {0}")]
    InvalidAssemblerName(String),

    #[error("unknown assembler '{name}', available: {available}")]
    UnknownAssembler { name: String, available: String },

    #[error("failed to read assembler configuration at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse assembler configuration: {0}")]
    ConfigParse(String),

    #[error("assembler '{assembler}' defines unsupported stage '{stage}'")]
    UnsupportedStage { assembler: String, stage: String },

    #[error("stage '{stage}' references unknown placeholder '{placeholder}'")]
    UnknownPlaceholder { stage: String, placeholder: String },

    #[error("unbalanced braces in template for stage '{stage}'")]
    MalformedTemplate { stage: String },

    #[error("empty command for stage '{stage}'")]
    EmptyCommand { stage: String },

    #[error("unterminated quote in command for stage '{stage}'")]
    UnterminatedQuote { stage: String },

    #[error("{tool} failed during {stage} (exit status {code}): {message}")]
    ExternalTool {
        tool: String,
        stage: String,
        code: i32,
        message: String,
    },

    #[error("failed to run {tool}: {message}")]
    ToolSpawn { tool: String, message: String },

    #[error("malformed run info: {0}")]
    RunInfo(String),

    #[error("run info table is missing the Run column")]
    MissingRunColumn,

    #[error("query '{0}' matched no sequencing runs")]
    EmptyResult(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("unable to resolve the assembler configuration directory")]
    ConfigDir,
}
