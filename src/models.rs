use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::StmtError;
use crate::formats::StatementFormat;
use crate::workbook::{Cell, Sheet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Issuer {
    Icici,
    Sbi,
    Hdfc,
}

pub const ALL_ISSUERS: &[Issuer] = &[Issuer::Sbi, Issuer::Hdfc, Issuer::Icici];

impl Issuer {
    /// Lowercase key used for input directories, CLI flags and log entries.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Icici => "icici",
            Self::Sbi => "sbi",
            Self::Hdfc => "hdfc",
        }
    }

    /// Uppercase prefix used for output artifact and sheet names.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Icici => "ICICI",
            Self::Sbi => "SBI",
            Self::Hdfc => "HDFC",
        }
    }

    pub fn format(&self) -> StatementFormat {
        match self {
            Self::Icici => StatementFormat::CardSectioned,
            Self::Sbi => StatementFormat::FixedFieldSequential,
            Self::Hdfc => StatementFormat::TableRegionFiltered,
        }
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Icici => &["Date", "Description", "Amount", "Card"],
            Self::Sbi => &["Date", "Description", "Amount", "Type"],
            Self::Hdfc => &["Date", "Description", "Amount"],
        }
    }

    /// `<ISSUER>_<stem>`, the name shared by the output workbook and its sheet.
    pub fn artifact_stem(&self, stem: &str) -> String {
        format!("{}_{stem}", self.label())
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Issuer {
    type Err = StmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ALL_ISSUERS
            .iter()
            .find(|i| i.key().eq_ignore_ascii_case(wanted))
            .copied()
            .ok_or_else(|| StmtError::UnknownIssuer(wanted.to_string()))
    }
}

/// Parse a comma-separated issuer selection. Unknown names are returned
/// separately so the caller can warn about them.
pub fn parse_issuer_list(raw: &str) -> (Vec<Issuer>, Vec<String>) {
    let mut selected = Vec::new();
    let mut unknown = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<Issuer>() {
            Ok(issuer) if !selected.contains(&issuer) => selected.push(issuer),
            Ok(_) => {}
            Err(_) => unknown.push(part.to_string()),
        }
    }
    (selected, unknown)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period {
    pub month: u32,
    pub year: i32,
}

impl Period {
    /// `MM_YYYY`, the stem every statement file and merged workbook uses.
    pub fn stem(&self) -> String {
        format!("{:02}_{}", self.month, self.year)
    }

    pub fn from_stem(stem: &str) -> Option<Self> {
        let (mm, yyyy) = stem.split_once('_')?;
        if mm.len() != 2 || yyyy.len() != 4 {
            return None;
        }
        let month: u32 = mm.parse().ok()?;
        let year: i32 = yyyy.parse().ok()?;
        (1..=12).contains(&month).then_some(Self { month, year })
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

#[derive(Debug, Clone)]
pub struct StatementFile {
    pub issuer: Issuer,
    pub path: PathBuf,
    pub period: Option<Period>,
    pub password: Option<String>,
}

impl StatementFile {
    pub fn new(issuer: Issuer, path: &Path, password: Option<&str>) -> Self {
        let period = Period::from_stem(&file_stem(path));
        Self {
            issuer,
            path: path.to_path_buf(),
            period,
            password: password.map(str::to_string),
        }
    }

    pub fn stem(&self) -> String {
        file_stem(&self.path)
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn artifact_stem(&self) -> String {
        self.issuer.artifact_stem(&self.stem())
    }
}

pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLine {
    pub position: usize,
    pub text: String,
}

/// Trim every line, drop blank ones and number what is left.
pub fn raw_lines(text: &str) -> Vec<RawLine> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .enumerate()
        .map(|(position, text)| RawLine {
            position,
            text: text.to_string(),
        })
        .collect()
}

/// Bounding region of a detected table, in line/column units of the page text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub top: usize,
    pub bottom: usize,
    pub left: usize,
    pub right: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRegion {
    pub page: usize,
    pub bbox: Region,
    pub rows: Vec<Vec<String>>,
}

/// A reconstructed record before credit filtering and amount coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: String,
    pub description: String,
    pub amount_text: String,
    pub card: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub date: String,
    pub description: String,
    /// Always a non-negative magnitude.
    pub amount: f64,
    pub card: Option<String>,
    pub kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryRow {
    pub label: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub transactions: Vec<Transaction>,
    pub summaries: Vec<SummaryRow>,
}

impl NormalizedTable {
    pub fn empty(issuer: Issuer, sheet_name: &str) -> Self {
        Self {
            sheet_name: sheet_name.to_string(),
            columns: issuer.columns().iter().map(|c| c.to_string()).collect(),
            transactions: Vec::new(),
            summaries: Vec::new(),
        }
    }

    /// No transaction rows, whether or not totals were appended.
    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn total(&self) -> f64 {
        self.summaries.last().map(|s| s.amount).unwrap_or(0.0)
    }

    /// Lay the table out as a sheet: header row, transactions, then summary
    /// rows with blank date and extra column.
    pub fn to_sheet(&self) -> Sheet {
        let width = self.columns.len();
        let mut rows = Vec::with_capacity(self.transactions.len() + self.summaries.len() + 1);
        rows.push(self.columns.iter().map(|c| Cell::Text(c.clone())).collect());

        for txn in &self.transactions {
            let mut row = vec![
                Cell::Text(txn.date.clone()),
                Cell::Text(txn.description.clone()),
                Cell::Number(txn.amount),
            ];
            if width > 3 {
                let extra = txn.card.clone().or_else(|| txn.kind.clone()).unwrap_or_default();
                row.push(Cell::text_or_empty(&extra));
            }
            rows.push(row);
        }

        for summary in &self.summaries {
            let mut row = vec![
                Cell::Empty,
                Cell::Text(summary.label.clone()),
                Cell::Number(summary.amount),
            ];
            row.resize(width.max(3), Cell::Empty);
            rows.push(row);
        }

        Sheet::new(&self.sheet_name, rows)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProcessedKey {
    pub issuer: Issuer,
    pub filename: String,
}

impl ProcessedKey {
    pub fn new(issuer: Issuer, filename: &str) -> Self {
        Self {
            issuer,
            filename: filename.to_string(),
        }
    }
}

impl fmt::Display for ProcessedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.issuer.key(), self.filename)
    }
}

impl FromStr for ProcessedKey {
    type Err = StmtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (issuer, filename) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| StmtError::Other(format!("Malformed log entry: {s}")))?;
        Ok(Self::new(issuer.parse()?, filename))
    }
}
