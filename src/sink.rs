//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of multiplug.
//! The multiplug project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! Output destinations of a batch computation: results, logs and reports.
//!
//! Results and logs are TSV. A field holding a tab, a newline or a double
//! quote is written quoted, and [`tsv_reader`] reads it back as one field.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::errors::Result;

/// Reader for the TSV files of a batch computation: no header, rows of any
/// length, quoted fields as written by [`MpSink::write_record`].
pub fn tsv_reader(path: impl AsRef<Path>) -> Result<csv::Reader<File>> {
    Ok(csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .flexible(true)
        .from_path(path)?)
}

pub enum MpSink {
    Stdout,
    Stderr,
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

impl MpSink {
    /// Opens a file for appending, creating it if needed.
    pub fn append(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(MpSink::File {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Creates or truncates a file.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path)?;
        Ok(MpSink::File {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            MpSink::File { path, .. } => Some(path),
            _ => None,
        }
    }

    /// Writes one TSV record.
    pub fn write_record<I, T>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quote_style(csv::QuoteStyle::Necessary)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(&mut *self);
        writer.write_record(fields)?;
        writer.flush()?;
        Ok(())
    }

}

impl Write for MpSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            MpSink::Stdout => io::stdout().write(buf),
            MpSink::Stderr => io::stderr().write(buf),
            MpSink::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            MpSink::Stdout => io::stdout().flush(),
            MpSink::Stderr => io::stderr().flush(),
            MpSink::File { writer, .. } => writer.flush(),
        }
    }
}

impl fmt::Debug for MpSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MpSink::Stdout => f.write_str("MpSink::Stdout"),
            MpSink::Stderr => f.write_str("MpSink::Stderr"),
            MpSink::File { path, .. } => write!(f, "MpSink::File({})", path.display()),
        }
    }
}
