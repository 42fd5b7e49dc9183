use std::collections::BTreeMap;
use std::fmt;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;

use crate::error::QandaError;

/// Placeholders an assembler template may reference.
pub const PLACEHOLDERS: [&str; 5] = ["acc", "fwd", "rev", "outdir", "cores"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Pre,
    Command,
    Post,
}

impl Stage {
    pub const ORDER: [Stage; 3] = [Stage::Pre, Stage::Command, Stage::Post];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pre => "pre",
            Stage::Command => "command",
            Stage::Post => "post",
        }
    }

    fn from_key(key: &str) -> Option<Stage> {
        match key {
            "pre" => Some(Stage::Pre),
            "command" => Some(Stage::Command),
            "post" => Some(Stage::Post),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct StageValues {
    pub acc: String,
    pub fwd: Utf8PathBuf,
    pub rev: Utf8PathBuf,
    pub outdir: Utf8PathBuf,
    pub cores: u32,
}

impl StageValues {
    fn get(&self, name: &str) -> Option<String> {
        match name {
            "acc" => Some(self.acc.clone()),
            "fwd" => Some(self.fwd.to_string()),
            "rev" => Some(self.rev.to_string()),
            "outdir" => Some(self.outdir.to_string()),
            "cores" => Some(self.cores.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    name: String,
    stages: BTreeMap<Stage, String>,
}

impl AssemblerConfig {
    pub fn load(config_dir: &Utf8Path, name: &str) -> Result<Self, QandaError> {
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(QandaError::InvalidAssemblerName(name.to_string()));
        }

        let path = config_dir.join(format!("{name}.json"));
        if !path.as_std_path().is_file() {
            let available = available(config_dir);
            let available = if available.is_empty() {
                format!("none (no configurations in {config_dir})")
            } else {
                available.join(", ")
            };
            return Err(QandaError::UnknownAssembler {
                name: name.to_string(),
                available,
            });
        }

        let content =
            fs::read_to_string(path.as_std_path()).map_err(|_| QandaError::ConfigRead(path))?;
        let raw: BTreeMap<String, String> = serde_json::from_str(&content)
            .map_err(|err| QandaError::ConfigParse(err.to_string()))?;

        Self::from_stages(name, raw)
    }

    pub fn from_stages(
        name: &str,
        raw: BTreeMap<String, String>,
    ) -> Result<Self, QandaError> {
        let mut stages = BTreeMap::new();
        for (key, template) in raw {
            let stage = Stage::from_key(&key).ok_or_else(|| QandaError::UnsupportedStage {
                assembler: name.to_string(),
                stage: key.clone(),
            })?;
            for placeholder in placeholders(stage, &template)? {
                if !PLACEHOLDERS.contains(&placeholder.as_str()) {
                    return Err(QandaError::UnknownPlaceholder {
                        stage: stage.to_string(),
                        placeholder,
                    });
                }
            }
            stages.insert(stage, template);
        }

        Ok(Self {
            name: name.to_string(),
            stages,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renders each configured, non-empty stage in execution order.
    pub fn substitute(
        &self,
        values: &StageValues,
    ) -> Result<Vec<(Stage, String)>, QandaError> {
        let mut commands = Vec::new();
        for stage in Stage::ORDER {
            let Some(template) = self.stages.get(&stage) else {
                continue;
            };
            if template.trim().is_empty() {
                continue;
            }
            commands.push((stage, render(stage, template, values)?));
        }
        Ok(commands)
    }
}

fn render(stage: Stage, template: &str, values: &StageValues) -> Result<String, QandaError> {
    let mut out = String::with_capacity(template.len());
    scan(stage, template, |piece| {
        match piece {
            Piece::Literal(ch) => out.push(ch),
            Piece::Placeholder(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| QandaError::UnknownPlaceholder {
                        stage: stage.to_string(),
                        placeholder: name.to_string(),
                    })?;
                out.push_str(&value);
            }
        }
        Ok(())
    })?;
    Ok(out)
}

fn placeholders(stage: Stage, template: &str) -> Result<Vec<String>, QandaError> {
    let mut names = Vec::new();
    scan(stage, template, |piece| {
        if let Piece::Placeholder(name) = piece {
            names.push(name.to_string());
        }
        Ok(())
    })?;
    Ok(names)
}

enum Piece<'t> {
    Literal(char),
    Placeholder(&'t str),
}

/// Walks a template, yielding literal characters and `{name}` placeholders.
/// `{{` and `}}` escape literal braces; anything else brace-shaped is an
/// error.
fn scan<'t, F>(stage: Stage, template: &'t str, mut emit: F) -> Result<(), QandaError>
where
    F: FnMut(Piece<'t>) -> Result<(), QandaError>,
{
    let malformed = || QandaError::MalformedTemplate {
        stage: stage.to_string(),
    };

    let mut rest = template;
    while let Some(ch) = rest.chars().next() {
        match ch {
            '{' if rest.starts_with("{{") => {
                emit(Piece::Literal('{'))?;
                rest = &rest[2..];
            }
            '}' if rest.starts_with("}}") => {
                emit(Piece::Literal('}'))?;
                rest = &rest[2..];
            }
            '{' => {
                let body = &rest[1..];
                let end = body.find('}').ok_or_else(malformed)?;
                let name = &body[..end];
                if name.is_empty()
                    || !name
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(malformed());
                }
                emit(Piece::Placeholder(name))?;
                rest = &body[end + 1..];
            }
            '}' => return Err(malformed()),
            _ => {
                emit(Piece::Literal(ch))?;
                rest = &rest[ch.len_utf8()..];
            }
        }
    }
    Ok(())
}

pub fn available(config_dir: &Utf8Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(config_dir.as_std_path()) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension().map(|ext| ext == "json").unwrap_or(false) {
                path.file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(str::to_string)
            } else {
                None
            }
        })
        .collect();
    names.sort();
    names
}

pub fn default_config_dir() -> Result<Utf8PathBuf, QandaError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("qanda")).ok())
        .ok_or(QandaError::ConfigDir)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn values() -> StageValues {
        StageValues {
            acc: "SRR000001".to_string(),
            fwd: Utf8PathBuf::from("fastqs/SRR000001_pass_1.fastq.gz"),
            rev: Utf8PathBuf::from("fastqs/SRR000001_pass_2.fastq.gz"),
            outdir: Utf8PathBuf::from("assemblies/SRR000001"),
            cores: 4,
        }
    }

    fn config(stages: &[(&str, &str)]) -> Result<AssemblerConfig, QandaError> {
        let raw = stages
            .iter()
            .map(|(key, template)| (key.to_string(), template.to_string()))
            .collect();
        AssemblerConfig::from_stages("spades", raw)
    }

    #[test]
    fn substitution_is_exact() {
        let config = config(&[("command", "assemble --in {fwd} --out {outdir}")]).unwrap();
        let commands = config.substitute(&values()).unwrap();
        assert_eq!(
            commands,
            vec![(
                Stage::Command,
                "assemble --in fastqs/SRR000001_pass_1.fastq.gz --out assemblies/SRR000001"
                    .to_string()
            )]
        );
    }

    #[test]
    fn stages_run_pre_command_post() {
        let config = config(&[
            ("post", "gzip {outdir}/contigs.fa"),
            ("pre", "rm -rf {outdir}"),
            ("command", "spades.py -o {outdir}"),
        ])
        .unwrap();
        let stages: Vec<Stage> = config
            .substitute(&values())
            .unwrap()
            .into_iter()
            .map(|(stage, _)| stage)
            .collect();
        assert_eq!(stages, vec![Stage::Pre, Stage::Command, Stage::Post]);
    }

    #[test]
    fn missing_stages_are_skipped() {
        let config = config(&[("command", "skesa --cores {cores}"), ("pre", "  ")]).unwrap();
        let commands = config.substitute(&values()).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].1, "skesa --cores 4");
    }

    #[test]
    fn unknown_placeholder_rejected_at_load() {
        let err = config(&[("command", "assemble --in {reads}")]).unwrap_err();
        assert_matches!(err, QandaError::UnknownPlaceholder { placeholder, .. } => {
            assert_eq!(placeholder, "reads");
        });
    }

    #[test]
    fn unsupported_stage_rejected_at_load() {
        let err = config(&[("cleanup", "rm -rf {outdir}")]).unwrap_err();
        assert_matches!(err, QandaError::UnsupportedStage { stage, .. } => {
            assert_eq!(stage, "cleanup");
        });
    }

    #[test]
    fn braces_escape() {
        let config = config(&[("command", "awk '{{print $1}}' {fwd}")]).unwrap();
        let commands = config.substitute(&values()).unwrap();
        assert_eq!(
            commands[0].1,
            "awk '{print $1}' fastqs/SRR000001_pass_1.fastq.gz"
        );
    }

    #[test]
    fn stray_brace_is_malformed() {
        let err = config(&[("command", "assemble {fwd")]).unwrap_err();
        assert_matches!(err, QandaError::MalformedTemplate { .. });
    }

    #[test]
    fn load_reads_json_and_lists_available() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(
            dir.path().join("spades.json"),
            r#"{"command": "spades.py -1 {fwd} -2 {rev} -o {outdir} --threads {cores}"}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("skesa.json"), r#"{"command": "skesa"}"#).unwrap();

        let config = AssemblerConfig::load(dir_path, "spades").unwrap();
        assert_eq!(config.name(), "spades");

        assert_eq!(available(dir_path), vec!["skesa", "spades"]);

        let err = AssemblerConfig::load(dir_path, "velvet").unwrap_err();
        assert_matches!(err, QandaError::UnknownAssembler { available, .. } => {
            assert_eq!(available, "skesa, spades");
        });
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let dir_path = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(dir.path().join("broken.json"), "not json").unwrap();

        let err = AssemblerConfig::load(dir_path, "broken").unwrap_err();
        assert_matches!(err, QandaError::ConfigParse(_));
    }
}
