use std::io::Write;
use std::process::{Command, Stdio};

use crate::error::QandaError;

/// Runs one external command, optionally piping bytes to its stdin, and
/// returns its captured stdout. Nonzero exit is fatal.
pub trait Invoker: Send + Sync {
    fn run(
        &self,
        stage: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, QandaError>;
}

impl<I: Invoker + ?Sized> Invoker for &I {
    fn run(
        &self,
        stage: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, QandaError> {
        (**self).run(stage, argv, stdin)
    }
}

pub struct SystemInvoker;

impl Invoker for SystemInvoker {
    fn run(
        &self,
        stage: &str,
        argv: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<Vec<u8>, QandaError> {
        let (program, args) = argv.split_first().ok_or_else(|| QandaError::EmptyCommand {
            stage: stage.to_string(),
        })?;

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|err| QandaError::ToolSpawn {
            tool: program.clone(),
            message: err.to_string(),
        })?;

        let mut write_result = Ok(());
        if let (Some(bytes), Some(mut handle)) = (stdin, child.stdin.take()) {
            write_result = handle.write_all(bytes);
        }

        let output = child
            .wait_with_output()
            .map_err(|err| QandaError::ToolSpawn {
                tool: program.clone(),
                message: err.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                "no error output".to_string()
            } else {
                stderr
            };
            return Err(QandaError::ExternalTool {
                tool: program.clone(),
                stage: stage.to_string(),
                code: output.status.code().unwrap_or(-1),
                message,
            });
        }

        // A broken pipe only matters if the tool then exited cleanly.
        write_result.map_err(|err| QandaError::ToolSpawn {
            tool: program.clone(),
            message: format!("writing stdin: {err}"),
        })?;

        Ok(output.stdout)
    }
}

pub fn split_command(stage: &str, line: &str) -> Result<Vec<String>, QandaError> {
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum Mode {
        Normal,
        SingleQuoted,
        DoubleQuoted,
    }

    let mut out = Vec::new();
    let mut current = String::new();
    let mut mode = Mode::Normal;
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        match mode {
            Mode::Normal => match ch {
                '\'' => mode = Mode::SingleQuoted,
                '"' => mode = Mode::DoubleQuoted,
                '\\' => {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                }
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        out.push(current.clone());
                        current.clear();
                    }
                }
                _ => current.push(ch),
            },
            Mode::SingleQuoted => {
                if ch == '\'' {
                    mode = Mode::Normal;
                } else {
                    current.push(ch);
                }
            }
            Mode::DoubleQuoted => {
                if ch == '"' {
                    mode = Mode::Normal;
                } else if ch == '\\' {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else {
                    current.push(ch);
                }
            }
        }
    }

    if mode != Mode::Normal {
        return Err(QandaError::UnterminatedQuote {
            stage: stage.to_string(),
        });
    }
    if !current.is_empty() {
        out.push(current);
    }
    if out.is_empty() {
        return Err(QandaError::EmptyCommand {
            stage: stage.to_string(),
        });
    }
    Ok(out)
}
