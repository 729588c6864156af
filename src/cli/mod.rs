pub mod convert;
pub mod init;
pub mod merge;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "stmerge",
    about = "Convert card statement PDFs to spreadsheets and merge them into monthly workbooks."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Write settings and create the statement and output directories.
    Init {
        /// Root directory holding sbi/, hdfc/, icici/ and excel/ (default: ~/Documents/statements)
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
    /// Convert every statement PDF of one issuer in a directory.
    Convert {
        /// Issuer: sbi, hdfc or icici
        issuer: String,
        /// Directory to read statement PDFs from
        #[arg(long = "in-dir")]
        in_dir: String,
        /// Directory to store statement XLSX files in
        #[arg(long = "out-dir")]
        out_dir: String,
        /// Password for the statement PDFs
        #[arg(long)]
        password: Option<String>,
        /// Prompt for the password instead of passing it on the command line
        #[arg(long = "ask-password", conflicts_with = "password")]
        ask_password: bool,
        /// Also write each table as CSV
        #[arg(long)]
        csv: bool,
        /// Keep the extracted text next to each workbook
        #[arg(long = "keep-text")]
        keep_text: bool,
    },
    /// Convert new statements for every month and merge them per month.
    Merge {
        /// Comma-separated issuers to process
        #[arg(long, default_value = "sbi,hdfc,icici")]
        banks: String,
        /// Password for SBI statements
        #[arg(long = "sbi-password")]
        sbi_password: Option<String>,
        /// Password for HDFC statements
        #[arg(long = "hdfc-password")]
        hdfc_password: Option<String>,
        /// Password for ICICI statements
        #[arg(long = "icici-password")]
        icici_password: Option<String>,
        /// Override the data directory from settings
        #[arg(long = "data-dir")]
        data_dir: Option<String>,
    },
}
