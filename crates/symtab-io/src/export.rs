//! Export orchestration: chunk values per locale and honour `WriteMode`.

use symtab_core::protocol::{ExportSpec, FileFormat, WriteMode};
use symtab_core::scalar::Scalar;

use crate::error::{Error, Result};
use crate::writers::csv::CsvWriter;
use crate::writers::dataset::DatasetFile;

/// Write `values` as `spec.dataset` across `num_locales` files.
///
/// Each locale receives one contiguous chunk. Append mode requires every
/// locale file to exist already; nothing is created implicitly. Returns a
/// human-readable summary.
pub fn export_values(values: &[Scalar], spec: &ExportSpec, num_locales: usize) -> Result<String> {
    let num_locales = num_locales.max(1);
    if spec.compression.is_some() && spec.format != FileFormat::Columnar {
        return Err(Error::Unsupported("compression requires the columnar format"));
    }

    let paths: Vec<String> = (0..num_locales).map(|i| spec.locale_path(i)).collect();
    if spec.mode == WriteMode::Append {
        if let Some(missing) = paths.iter().find(|p| !std::path::Path::new(p).exists()) {
            return Err(Error::MissingFile(missing.clone()));
        }
    }

    let chunk = values.len().div_ceil(num_locales).max(1);
    let mut chunks = values.chunks(chunk);
    for path in &paths {
        let part = chunks.next().unwrap_or(&[]);
        match (spec.format, spec.mode) {
            (FileFormat::Columnar, WriteMode::Truncate) => {
                DatasetFile::single(&spec.dataset, part.to_vec()).save(path, spec.compression)?;
            }
            (FileFormat::Columnar, WriteMode::Append) => {
                let mut file = DatasetFile::load(path)?;
                file.insert_new(path, &spec.dataset, part.to_vec())?;
                file.save(path, spec.compression)?;
            }
            (FileFormat::Csv, WriteMode::Truncate) => {
                CsvWriter::to_path(path)?.write_column(&spec.dataset, part)?;
            }
            (FileFormat::Csv, WriteMode::Append) => {
                CsvWriter::append_to_path(path, &spec.dataset)?.write_column(&spec.dataset, part)?;
            }
        }
    }

    Ok(format!(
        "wrote dataset '{}' ({} values) to {} file(s) with prefix {}",
        spec.dataset,
        values.len(),
        paths.len(),
        spec.prefix_path
    ))
}
