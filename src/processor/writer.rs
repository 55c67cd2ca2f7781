//! CSV output writing for extraction results
//!
//! Writes retained rows either through a CSV writer (standard quoting for
//! embedded delimiters) or verbatim, with an optional UTF-8 BOM. Output goes
//! to a temporary file in the destination directory and is renamed into
//! place once complete, so a failed run never leaves a truncated file.

use crate::constants::UTF8_BOM_BYTES;
use crate::error::{PopdataError, Result};
use crate::models::ExtractedRow;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Output options for a single result file
#[derive(Debug, Clone)]
pub struct OutputWriter {
    output_path: PathBuf,
    write_bom: bool,
    atomic: bool,
}

impl OutputWriter {
    pub fn new(output_path: PathBuf) -> Self {
        Self {
            output_path,
            write_bom: true,
            atomic: true,
        }
    }

    pub fn with_bom(mut self, write_bom: bool) -> Self {
        self.write_bom = write_bom;
        self
    }

    pub fn with_atomic(mut self, atomic: bool) -> Self {
        self.atomic = atomic;
        self
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Write all rows, replacing any existing file at the output path
    pub fn write_rows(&self, rows: &[ExtractedRow]) -> Result<usize> {
        self.write_with(|sink| write_rows_to(sink, rows, self.write_bom, &self.output_path))?;
        debug!(
            "Wrote {} rows to {}",
            rows.len(),
            self.output_path.display()
        );
        Ok(rows.len())
    }

    /// Run `body` against a buffered sink for the output path
    pub fn write_with<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce(&mut dyn Write) -> Result<()>,
    {
        let io_err = |e: std::io::Error| PopdataError::IoFailure {
            path: self.output_path.clone(),
            source: e,
        };

        if !self.atomic {
            let file = File::create(&self.output_path).map_err(io_err)?;
            let mut sink = BufWriter::new(file);
            body(&mut sink)?;
            return sink.flush().map_err(io_err);
        }

        let parent = match self.output_path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let temp = NamedTempFile::new_in(&parent).map_err(io_err)?;
        {
            let mut sink = BufWriter::new(temp.as_file());
            body(&mut sink)?;
            sink.flush().map_err(io_err)?;
        }
        temp.as_file().sync_all().map_err(io_err)?;
        temp.persist(&self.output_path)
            .map_err(|e| io_err(e.error))?;

        Ok(())
    }
}

/// Serialize rows to `sink`, prefixed with a BOM when requested.
///
/// Field rows go through a CSV writer for standard quoting; verbatim rows are
/// copied byte for byte. Any failure is reported against `path`.
pub fn write_rows_to(
    sink: &mut dyn Write,
    rows: &[ExtractedRow],
    write_bom: bool,
    path: &Path,
) -> Result<()> {
    let io_err = |source: io::Error| PopdataError::IoFailure {
        path: path.to_path_buf(),
        source,
    };

    if write_bom {
        sink.write_all(UTF8_BOM_BYTES).map_err(io_err)?;
    }

    // Consecutive rows of the same kind share one CSV writer
    for run in rows.chunk_by(|a, b| a.is_verbatim() == b.is_verbatim()) {
        if run[0].is_verbatim() {
            for row in run {
                if let ExtractedRow::Verbatim(line) = row {
                    sink.write_all(line.as_bytes()).map_err(io_err)?;
                    sink.write_all(b"\n").map_err(io_err)?;
                }
            }
            continue;
        }

        let mut csv_writer = csv::WriterBuilder::new()
            .flexible(true)
            .has_headers(false)
            .from_writer(&mut *sink);
        for row in run {
            if let ExtractedRow::Fields(fields) = row {
                csv_writer
                    .write_record(fields)
                    .map_err(|e| io_err(csv_io_error(e)))?;
            }
        }
        csv_writer.flush().map_err(io_err)?;
    }

    sink.flush().map_err(io_err)
}

/// Unwrap the I/O cause of a CSV write error
fn csv_io_error(error: csv::Error) -> io::Error {
    match error.into_kind() {
        csv::ErrorKind::Io(source) => source,
        other => io::Error::other(format!("{:?}", other)),
    }
}
