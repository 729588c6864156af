use std::path::Path;

use calamine::{Data, Reader};
use rust_xlsxwriter::Workbook;

use crate::error::Result;

/// Longest sheet name the xlsx format accepts.
pub const SHEET_NAME_LIMIT: usize = 31;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
}

impl Cell {
    pub fn text_or_empty(s: &str) -> Self {
        if s.is_empty() {
            Self::Empty
        } else {
            Self::Text(s.to_string())
        }
    }

    pub fn as_text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Text(s) => s.clone(),
            Self::Number(n) => n.to_string(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Self::Empty,
            Data::String(s) => Self::text_or_empty(s),
            Data::Float(f) => Self::Number(*f),
            Data::Int(i) => Self::Number(*i as f64),
            Data::Bool(b) => Self::Text(b.to_string()),
            Data::DateTime(dt) => Self::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Error(e) => Self::Text(format!("{e:?}")),
        }
    }
}

/// One worksheet worth of raw cells. The first row is the header row.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: truncate_sheet_name(name),
            rows,
        }
    }

    #[cfg(test)]
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|r| r.iter().map(Cell::as_text).collect())
            .unwrap_or_default()
    }
}

pub fn truncate_sheet_name(name: &str) -> String {
    name.chars().take(SHEET_NAME_LIMIT).collect()
}

/// Write the sheets into a new workbook, replacing any file already at `path`.
pub fn write_sheets(path: &Path, sheets: &[Sheet]) -> Result<()> {
    let mut workbook = Workbook::new();
    for sheet in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(truncate_sheet_name(&sheet.name))?;
        for (r, row) in sheet.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                let (r, c) = (r as u32, c as u16);
                match cell {
                    Cell::Empty => {}
                    Cell::Text(s) => {
                        worksheet.write_string(r, c, s)?;
                    }
                    Cell::Number(n) => {
                        worksheet.write_number(r, c, *n)?;
                    }
                }
            }
        }
    }
    workbook.save(path)?;
    Ok(())
}

/// Read every sheet of a workbook as raw, unheadered cells.
pub fn read_sheets(path: &Path) -> Result<Vec<Sheet>> {
    let mut workbook = calamine::open_workbook_auto(path)?;
    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook.worksheet_range(&name)?;
        // Ranges start at the first used cell; pad back to A1.
        let (row_offset, col_offset) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));
        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; col_offset];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }
        sheets.push(Sheet { name, rows });
    }
    Ok(sheets)
}

pub fn write_csv(path: &Path, sheet: &Sheet) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for row in &sheet.rows {
        wtr.write_record(row.iter().map(Cell::as_text))?;
    }
    wtr.flush()?;
    Ok(())
}
