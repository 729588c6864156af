use std::path::PathBuf;

use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::batch::{process_dir, BatchOptions};
use crate::error::{Result, StmtError};
use crate::extract::PdfTextExtractor;
use crate::fmt::amount;
use crate::models::Issuer;
use crate::settings::load_settings;

pub struct ConvertArgs {
    pub issuer: String,
    pub in_dir: String,
    pub out_dir: String,
    pub password: Option<String>,
    pub ask_password: bool,
    pub csv: bool,
    pub keep_text: bool,
}

pub fn run(args: ConvertArgs) -> Result<()> {
    let issuer: Issuer = args.issuer.parse()?;
    let password = if args.ask_password {
        let prompt = format!("{} statement password: ", issuer.label());
        Some(rpassword::prompt_password(prompt).map_err(|e| StmtError::Other(format!("Could not read password: {e}")))?)
    } else {
        args.password
    };

    let in_dir = PathBuf::from(&args.in_dir);
    let out_dir = PathBuf::from(&args.out_dir);
    std::fs::create_dir_all(&out_dir)?;

    let options = BatchOptions {
        scratch_text: args.keep_text,
        csv: args.csv,
    };
    let settings = load_settings();
    let report = process_dir(
        issuer,
        &in_dir,
        &out_dir,
        password.as_deref(),
        &PdfTextExtractor,
        &settings,
        options,
    )?;

    if report.succeeded.is_empty() && report.failed.is_empty() {
        println!("No statement PDFs found in {}", in_dir.display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["File", "Status", "Rows", "Total"]);
    for ok in &report.succeeded {
        table.add_row(vec![
            Cell::new(&ok.file_name),
            Cell::new("SUCCESS".green()),
            Cell::new(ok.rows),
            Cell::new(amount(ok.total)),
        ]);
    }
    for failed in &report.failed {
        table.add_row(vec![
            Cell::new(&failed.file_name),
            Cell::new("FAILED".red()),
            Cell::new(""),
            Cell::new(&failed.reason),
        ]);
    }
    println!("{issuer}\n{table}");
    Ok(())
}
