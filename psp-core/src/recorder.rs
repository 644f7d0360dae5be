//! Per-iteration persistence
//!
//! Two append-only comma-separated streams: sampled parameters and continuous
//! responses. Both start with a header row
//!
//! ```text
//! iteration,<name 1>,...,<name n>,pattern
//! ```
//!
//! followed by one row per evaluated candidate: the iteration index, the
//! vector components in configured order, and the identity of the region the
//! candidate mapped to. Response rows are only written for models returning
//! continuous responses.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::Array1;

use crate::error::Result;
use crate::types::{ParameterVector, RegionId};

/// One evaluated candidate
#[derive(Debug, Clone)]
pub struct IterationRecord {
    pub iteration: u32,
    pub point: ParameterVector,
    pub response: Option<Array1<f64>>,
    pub region: RegionId,
}

/// Sink for iteration records
pub trait Recorder {
    /// Write the header rows. Called once, before the first record.
    fn write_headers(
        &mut self,
        parameter_names: &[String],
        response_names: &[String],
    ) -> Result<()>;

    /// Append the rows for one candidate.
    fn record(&mut self, record: &IterationRecord) -> Result<()>;

    /// Push buffered rows to the underlying streams.
    fn flush(&mut self) -> Result<()>;
}

/// Recorder that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl Recorder for NullRecorder {
    fn write_headers(
        &mut self,
        _parameter_names: &[String],
        _response_names: &[String],
    ) -> Result<()> {
        Ok(())
    }

    fn record(&mut self, _record: &IterationRecord) -> Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Comma-separated recorder over a parameter stream and a response stream
#[derive(Debug)]
pub struct CsvRecorder<W: Write> {
    parameters: W,
    responses: W,
}

impl CsvRecorder<BufWriter<File>> {
    /// Create `<prefix>_parameters.csv` and `<prefix>_responses.csv` in `dir`.
    ///
    /// Existing files with those names are truncated.
    pub fn create(dir: &Path, prefix: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let (parameters, responses) = stream_paths(dir, prefix);
        Ok(Self {
            parameters: BufWriter::new(File::create(parameters)?),
            responses: BufWriter::new(File::create(responses)?),
        })
    }
}

/// Paths of the parameter and response streams for `prefix` in `dir`.
pub fn stream_paths(dir: &Path, prefix: &str) -> (PathBuf, PathBuf) {
    (
        dir.join(format!("{prefix}_parameters.csv")),
        dir.join(format!("{prefix}_responses.csv")),
    )
}

impl<W: Write> CsvRecorder<W> {
    pub fn from_writers(parameters: W, responses: W) -> Self {
        Self {
            parameters,
            responses,
        }
    }

    /// Recover the parameter and response writers.
    pub fn into_inner(self) -> (W, W) {
        (self.parameters, self.responses)
    }
}

impl<W: Write> Recorder for CsvRecorder<W> {
    fn write_headers(
        &mut self,
        parameter_names: &[String],
        response_names: &[String],
    ) -> Result<()> {
        write_header(&mut self.parameters, parameter_names)?;
        write_header(&mut self.responses, response_names)?;
        Ok(())
    }

    fn record(&mut self, record: &IterationRecord) -> Result<()> {
        write_row(&mut self.parameters, record.iteration, &record.point, record.region)?;
        if let Some(response) = &record.response {
            write_row(&mut self.responses, record.iteration, response, record.region)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.parameters.flush()?;
        self.responses.flush()?;
        Ok(())
    }
}

fn write_header<W: Write>(out: &mut W, names: &[String]) -> std::io::Result<()> {
    writeln!(out, "iteration,{},pattern", names.join(","))
}

fn write_row<W: Write>(
    out: &mut W,
    iteration: u32,
    values: &Array1<f64>,
    region: RegionId,
) -> std::io::Result<()> {
    write!(out, "{iteration}")?;
    for value in values {
        write!(out, ",{value}")?;
    }
    writeln!(out, ",{region}")
}
