use thiserror::Error;

use crate::extract::ExtractionError;

#[derive(Error, Debug)]
pub enum StmtError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Workbook write error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    #[error("Workbook read error: {0}")]
    Calamine(#[from] calamine::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Unknown issuer: {0}")]
    UnknownIssuer(String),

    #[error("No valid issuer selected (expected any of: icici, sbi, hdfc)")]
    NoIssuerSelected,

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StmtError>;
