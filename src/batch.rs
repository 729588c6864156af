use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::extract::Extractor;
use crate::formats::Extracted;
use crate::models::{Issuer, StatementFile};
use crate::parser::parse_statement;
use crate::settings::Settings;
use crate::workbook::{write_csv, write_sheets};

#[derive(Debug, Clone, Copy, Default)]
pub struct BatchOptions {
    /// Save the extracted page text next to the workbook as `<ISSUER>_<stem>.txt`.
    pub scratch_text: bool,
    /// Also write the table as `<ISSUER>_<stem>.csv`.
    pub csv: bool,
}

#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub file_name: String,
    pub workbook: PathBuf,
    pub rows: usize,
    pub total: f64,
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<FileOutcome>,
    pub failed: Vec<FileFailure>,
}

pub fn is_statement(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
}

/// Statement files in `in_dir`, in whatever order the filesystem lists them.
pub fn list_statements(in_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for entry in std::fs::read_dir(in_dir)? {
        let path = entry?.path();
        if is_statement(&path) {
            out.push(path);
        }
    }
    Ok(out)
}

pub fn workbook_path(out_dir: &Path, issuer: Issuer, stem: &str) -> PathBuf {
    out_dir.join(format!("{}.xlsx", issuer.artifact_stem(stem)))
}

pub fn scratch_path(out_dir: &Path, issuer: Issuer, stem: &str) -> PathBuf {
    out_dir.join(format!("{}.txt", issuer.artifact_stem(stem)))
}

/// Parse one statement and write its single-sheet workbook.
pub fn process_file(
    file: &StatementFile,
    out_dir: &Path,
    extractor: &dyn Extractor,
    settings: &Settings,
    options: BatchOptions,
) -> Result<FileOutcome> {
    let parsed = parse_statement(file, extractor, settings);
    let extracted = parsed.extracted?;
    let table = parsed.table;
    if table.is_empty() {
        tracing::warn!("{} {}: no transactions found", file.issuer, file.file_name());
    }
    std::fs::create_dir_all(out_dir)?;

    let stem = file.stem();
    if options.scratch_text {
        if let Extracted::Pages(pages) = &extracted {
            std::fs::write(scratch_path(out_dir, file.issuer, &stem), pages.concat())?;
        }
    }

    let sheet = table.to_sheet();
    let workbook = workbook_path(out_dir, file.issuer, &stem);
    write_sheets(&workbook, std::slice::from_ref(&sheet))?;
    if options.csv {
        write_csv(&workbook.with_extension("csv"), &sheet)?;
    }

    Ok(FileOutcome {
        file_name: file.file_name(),
        workbook,
        rows: table.transactions.len(),
        total: table.total(),
    })
}

/// Convert every statement in `in_dir`. A failing file is logged and the rest
/// of the directory is still processed.
pub fn process_dir(
    issuer: Issuer,
    in_dir: &Path,
    out_dir: &Path,
    password: Option<&str>,
    extractor: &dyn Extractor,
    settings: &Settings,
    options: BatchOptions,
) -> Result<BatchReport> {
    let mut report = BatchReport::default();
    for path in list_statements(in_dir)? {
        let file = StatementFile::new(issuer, &path, password);
        if file.period.is_none() {
            tracing::debug!("{} is not named MM_YYYY; merge will not pick it up", file.file_name());
        }
        match process_file(&file, out_dir, extractor, settings, options) {
            Ok(outcome) => {
                tracing::info!("{issuer}: SUCCESS {}", outcome.file_name);
                report.succeeded.push(outcome);
            }
            Err(e) => {
                tracing::warn!("{issuer}: FAILED {}: {e}", file.file_name());
                report.failed.push(FileFailure {
                    file_name: file.file_name(),
                    reason: e.to_string(),
                });
            }
        }
    }
    Ok(report)
}
