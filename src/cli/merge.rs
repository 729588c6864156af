use std::collections::BTreeMap;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::error::{Result, StmtError};
use crate::extract::PdfTextExtractor;
use crate::merger::MergeDriver;
use crate::models::{parse_issuer_list, Issuer};
use crate::settings::{load_settings, shellexpand_path};

pub struct MergeArgs {
    pub banks: String,
    pub sbi_password: Option<String>,
    pub hdfc_password: Option<String>,
    pub icici_password: Option<String>,
    pub data_dir: Option<String>,
}

pub fn run(args: MergeArgs) -> Result<()> {
    let (issuers, unknown) = parse_issuer_list(&args.banks);
    for name in &unknown {
        tracing::warn!("ignoring unknown bank {name:?}");
    }
    if issuers.is_empty() {
        return Err(StmtError::NoIssuerSelected);
    }

    let mut settings = load_settings();
    if let Some(dir) = args.data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    std::fs::create_dir_all(settings.output_dir())?;

    let mut passwords = BTreeMap::new();
    for (issuer, pw) in [
        (Issuer::Sbi, args.sbi_password),
        (Issuer::Hdfc, args.hdfc_password),
        (Issuer::Icici, args.icici_password),
    ] {
        if let Some(pw) = pw {
            passwords.insert(issuer, pw);
        }
    }

    let extractor = PdfTextExtractor;
    let mut driver = MergeDriver::new(&settings, &extractor, issuers, passwords)?;
    let summary = driver.run();

    let mut table = Table::new();
    table.set_header(vec!["Month", "Sheets", "New", "Failed"]);
    let mut any = false;
    for cell in &summary.cells {
        if cell.merged.is_none() && cell.failed.is_empty() {
            continue;
        }
        any = true;
        let month = cell.period.map(|p| p.to_string()).unwrap_or_default();
        let new: Vec<String> = cell.processed.iter().map(|k| k.to_string()).collect();
        let failed: Vec<String> = cell.failed.iter().map(|(k, _)| k.to_string()).collect();
        table.add_row(vec![
            Cell::new(month),
            Cell::new(cell.sheets.join(", ")),
            Cell::new(new.join(", ")),
            Cell::new(failed.join(", ").red()),
        ]);
    }

    if any {
        println!("{table}");
    }
    let merged = summary.merged_cells().count();
    let line = format!(
        "{} merged workbook(s), {} new statement(s), {} failed",
        merged,
        summary.processed_count(),
        summary.failed_count()
    );
    if summary.failed_count() > 0 {
        println!("{}", line.yellow());
    } else {
        println!("{}", line.green());
    }
    Ok(())
}
