use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::Datelike;

use crate::batch::{is_statement, process_file, scratch_path, workbook_path, BatchOptions};
use crate::error::{Result, StmtError};
use crate::extract::Extractor;
use crate::models::{file_stem, Issuer, Period, ProcessedKey, StatementFile, ALL_ISSUERS};
use crate::processed_log::ProcessedLog;
use crate::settings::Settings;
use crate::workbook::{read_sheets, truncate_sheet_name, write_sheets, Sheet};

/// Every month of every year from `start_year` through `end_year`, whether or
/// not the year is over yet.
pub fn time_grid(start_year: i32, end_year: i32) -> Vec<Period> {
    (start_year..=end_year)
        .flat_map(|year| (1..=12).map(move |month| Period { month, year }))
        .collect()
}

/// `<MM>_<YYYY>.pdf` in `dir`, extension matched case-insensitively.
pub fn find_statement(dir: &Path, period: Period) -> Option<PathBuf> {
    let stem = period.stem();
    let mut candidates: Vec<PathBuf> = std::fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| is_statement(p) && file_stem(p) == stem)
        .collect();
    // Prefer `.pdf` over `.PDF` when both exist.
    candidates.sort_by(|a, b| b.cmp(a));
    candidates.into_iter().next()
}

pub fn merged_path(out_dir: &Path, period: Period) -> PathBuf {
    out_dir.join(format!("{}.xlsx", period.stem()))
}

#[derive(Debug, Default)]
pub struct CellOutcome {
    pub period: Option<Period>,
    pub processed: Vec<ProcessedKey>,
    pub already_processed: Vec<ProcessedKey>,
    pub failed: Vec<(ProcessedKey, String)>,
    pub merged: Option<PathBuf>,
    pub sheets: Vec<String>,
}

#[derive(Debug, Default)]
pub struct MergeSummary {
    pub cells: Vec<CellOutcome>,
}

impl MergeSummary {
    pub fn merged_cells(&self) -> impl Iterator<Item = &CellOutcome> {
        self.cells.iter().filter(|c| c.merged.is_some())
    }

    pub fn processed_count(&self) -> usize {
        self.cells.iter().map(|c| c.processed.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.cells.iter().map(|c| c.failed.len()).sum()
    }
}

pub struct MergeDriver<'a> {
    settings: &'a Settings,
    extractor: &'a dyn Extractor,
    issuers: Vec<Issuer>,
    passwords: BTreeMap<Issuer, String>,
    end_year: i32,
    log: ProcessedLog,
}

impl<'a> MergeDriver<'a> {
    pub fn new(
        settings: &'a Settings,
        extractor: &'a dyn Extractor,
        issuers: Vec<Issuer>,
        passwords: BTreeMap<Issuer, String>,
    ) -> Result<Self> {
        if issuers.is_empty() {
            return Err(StmtError::NoIssuerSelected);
        }
        let log = ProcessedLog::load(&ProcessedLog::path_in(&settings.output_dir()))?;
        Ok(Self {
            settings,
            extractor,
            issuers,
            passwords,
            end_year: chrono::Local::now().year(),
            log,
        })
    }

    #[cfg(test)]
    pub fn with_end_year(mut self, end_year: i32) -> Self {
        self.end_year = end_year;
        self
    }

    pub fn run(&mut self) -> MergeSummary {
        let mut summary = MergeSummary::default();
        for period in time_grid(self.settings.start_year, self.end_year) {
            match self.run_cell(period) {
                Ok(outcome) => summary.cells.push(outcome),
                Err(e) => {
                    tracing::error!("merge for {period} failed: {e}");
                }
            }
        }
        summary
    }

    /// Process and merge one `(month, year)` cell.
    pub fn run_cell(&mut self, period: Period) -> Result<CellOutcome> {
        let out_dir = self.settings.output_dir();
        let stem = period.stem();
        let mut outcome = CellOutcome {
            period: Some(period),
            ..CellOutcome::default()
        };

        for &issuer in &self.issuers {
            self.process_issuer(issuer, period, &out_dir, &mut outcome);
        }

        let artifacts: Vec<PathBuf> = ALL_ISSUERS
            .iter()
            .map(|&i| workbook_path(&out_dir, i, &stem))
            .filter(|p| p.exists())
            .collect();
        if artifacts.is_empty() {
            tracing::info!("no new statements for {period}, skipping merge");
            return Ok(outcome);
        }

        let merged = merged_path(&out_dir, period);
        let sheets = self.merge_sheets(&merged, &artifacts)?;
        if merged.exists() {
            std::fs::remove_file(&merged)?;
            tracing::info!("removed old merged workbook {}", merged.display());
        }
        write_sheets(&merged, &sheets)?;
        tracing::info!("merged workbook created: {}", merged.display());

        self.log.append(&outcome.processed)?;
        cleanup(&out_dir, &stem);

        outcome.sheets = sheets.into_iter().map(|s| s.name).collect();
        outcome.merged = Some(merged);
        Ok(outcome)
    }

    fn process_issuer(&self, issuer: Issuer, period: Period, out_dir: &Path, outcome: &mut CellOutcome) {
        let Some(pdf) = find_statement(&self.settings.input_dir(issuer), period) else {
            tracing::debug!("no {issuer} file for {}.pdf", period.stem());
            return;
        };

        let file = StatementFile::new(issuer, &pdf, self.passwords.get(&issuer).map(String::as_str));
        let key = ProcessedKey::new(issuer, &file.file_name());
        if self.log.contains(&key) {
            tracing::info!("already processed: {key}");
            outcome.already_processed.push(key);
            return;
        }

        tracing::info!("found {issuer} file: {}", file.file_name());
        let options = BatchOptions {
            scratch_text: true,
            csv: false,
        };
        match process_file(&file, out_dir, self.extractor, self.settings, options) {
            Ok(result) if result.workbook.exists() => {
                tracing::info!("{issuer}: SUCCESS ({} rows)", result.rows);
                outcome.processed.push(key);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("{issuer}: FAILED {}: {e}", file.file_name());
                outcome.failed.push((key, e.to_string()));
            }
        }
    }

    /// Sheets of the previous merged workbook, with any sheet of the same name
    /// replaced by the fresh per-issuer output.
    fn merge_sheets(&self, merged: &Path, artifacts: &[PathBuf]) -> Result<Vec<Sheet>> {
        let mut sheets = if merged.exists() {
            read_sheets(merged).unwrap_or_else(|e| {
                tracing::warn!("could not read previous {}: {e}", merged.display());
                Vec::new()
            })
        } else {
            Vec::new()
        };

        for path in artifacts {
            let Some(mut sheet) = read_sheets(path)?.into_iter().next() else {
                continue;
            };
            sheet.name = truncate_sheet_name(&file_stem(path));
            match sheets.iter_mut().find(|s| s.name == sheet.name) {
                Some(existing) => *existing = sheet,
                None => sheets.push(sheet),
            }
        }
        Ok(sheets)
    }
}

fn remove_logged(path: &Path) {
    if !path.exists() {
        return;
    }
    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("error deleting {}: {e}", path.display());
    }
}

/// Delete the per-issuer workbooks and text scratch files of one cell.
/// Failures are logged and never abort the run.
pub fn cleanup(out_dir: &Path, stem: &str) {
    for &issuer in ALL_ISSUERS {
        remove_logged(&workbook_path(out_dir, issuer, stem));
        remove_logged(&scratch_path(out_dir, issuer, stem));
    }
}
