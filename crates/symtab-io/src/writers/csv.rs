//! Single-column CSV writer.
//!
//! The header row is the dataset name; values are written via `Display`.

use std::fs::{File, OpenOptions};
use std::io::Write;

use csv as csv_crate;
use symtab_core::scalar::Scalar;

use crate::error::{Error, Result};

pub struct CsvWriter<W: Write> {
    wtr: csv_crate::Writer<W>,
    wrote_header: bool,
}

impl CsvWriter<File> {
    /// Create or truncate `path`.
    pub fn to_path(path: &str) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self::to_writer(file))
    }

    /// Append rows to an existing file whose header is `dataset`.
    pub fn append_to_path(path: &str, dataset: &str) -> Result<Self> {
        if !std::path::Path::new(path).exists() {
            return Err(Error::MissingFile(path.to_string()));
        }
        let mut rdr = csv_crate::Reader::from_path(path)?;
        let found = rdr.headers()?.iter().collect::<Vec<_>>().join(",");
        if found != dataset {
            return Err(Error::HeaderMismatch {
                path: path.to_string(),
                expected: dataset.to_string(),
                found,
            });
        }
        let file = OpenOptions::new().append(true).open(path)?;
        Ok(Self::to_writer_skip_header(file))
    }
}

impl<W: Write> CsvWriter<W> {
    pub fn to_writer(writer: W) -> Self {
        Self {
            wtr: csv_crate::Writer::from_writer(writer),
            wrote_header: false,
        }
    }

    /// Create a writer that assumes headers have already been written
    pub fn to_writer_skip_header(writer: W) -> Self {
        Self {
            wtr: csv_crate::Writer::from_writer(writer),
            wrote_header: true,
        }
    }

    pub fn write_column(&mut self, dataset: &str, values: &[Scalar]) -> Result<()> {
        if !self.wrote_header {
            self.wtr.write_record([dataset])?;
            self.wrote_header = true;
        }
        for v in values {
            self.wtr.write_record([v.to_string()])?;
        }
        self.wtr.flush()?;
        Ok(())
    }
}
