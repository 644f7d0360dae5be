//! Model and discretizer adapters for external executables.
//!
//! Each call spawns the program once, writes the input vector to its stdin as
//! a JSON array and parses stdout as JSON: a flat array is a continuous
//! response, an array of rows is a pattern matrix.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use ndarray::Array1;
use psp_core::{Discretizer, ModelOracle, OracleError, ParameterVector, Pattern, Response};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommandOutput {
    Vector(Vec<f64>),
    Matrix(Vec<Vec<i32>>),
}

/// A resolved executable plus its fixed arguments
#[derive(Debug, Clone)]
struct ExternalCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl ExternalCommand {
    fn resolve(name: &str, args: Vec<String>) -> Result<Self, OracleError> {
        let program = which::which(name)
            .map_err(|e| OracleError::ModelUnavailable(format!("{name}: {e}")))?;
        debug!(program = %program.display(), "Resolved oracle command");
        Ok(Self { program, args })
    }

    fn invoke(&self, input: &[f64]) -> Result<CommandOutput, OracleError> {
        let payload = serde_json::to_vec(input).map_err(|e| failure("encode input", e))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                OracleError::ModelUnavailable(format!("{}: {e}", self.program.display()))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .and_then(|()| stdin.write_all(b"\n"))
                .map_err(|e| failure("write input", e))?;
        }

        let output = child
            .wait_with_output()
            .map_err(|e| failure("wait for output", e))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OracleError::Evaluation(format!(
                "{} exited with {}: {}",
                self.program.display(),
                output.status,
                stderr.trim()
            )));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| failure("parse output", e))
    }
}

fn failure(stage: &str, err: impl std::fmt::Display) -> OracleError {
    OracleError::Evaluation(format!("failed to {stage}: {err}"))
}

/// Model oracle running one external process per candidate
#[derive(Debug, Clone)]
pub struct CommandOracle {
    command: ExternalCommand,
}

impl CommandOracle {
    /// Look up `name` on `PATH`.
    pub fn resolve(name: &str, args: Vec<String>) -> Result<Self, OracleError> {
        Ok(Self {
            command: ExternalCommand::resolve(name, args)?,
        })
    }
}

impl ModelOracle for CommandOracle {
    fn evaluate(&mut self, point: &ParameterVector) -> Result<Response, OracleError> {
        match self.command.invoke(&point.to_vec())? {
            CommandOutput::Vector(values) => Ok(Response::Continuous(Array1::from(values))),
            CommandOutput::Matrix(rows) => Ok(Response::Pattern(Pattern::from_rows(rows)?)),
        }
    }
}

/// Discretizer running one external process per response
#[derive(Debug, Clone)]
pub struct CommandDiscretizer {
    command: ExternalCommand,
}

impl CommandDiscretizer {
    pub fn resolve(name: &str, args: Vec<String>) -> Result<Self, OracleError> {
        Ok(Self {
            command: ExternalCommand::resolve(name, args)?,
        })
    }
}

impl Discretizer for CommandDiscretizer {
    fn discretize(&mut self, response: &Array1<f64>) -> Result<Pattern, OracleError> {
        match self.command.invoke(&response.to_vec())? {
            CommandOutput::Matrix(rows) => Pattern::from_rows(rows),
            CommandOutput::Vector(_) => Err(OracleError::Evaluation(
                "discretizer returned a vector instead of a pattern matrix".into(),
            )),
        }
    }
}
