//! PDF text and table extraction.
//!
//! Everything downstream talks to the [`Extractor`] trait. The default
//! [`PdfTextExtractor`] reads page text with `pdf-extract`; table regions are
//! recovered from that text in two passes: ruled (or densely aligned) regions
//! first, then cell splitting inside each region with continuation lines
//! folded into the row above.

use std::path::Path;

use thiserror::Error;

use crate::formats::{Extracted, StatementFormat};
use crate::models::{Region, TableRegion};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("PDF is encrypted and needs a password")]
    PasswordRequired,

    #[error("incorrect password")]
    WrongPassword,

    #[error("unreadable PDF: {0}")]
    Unreadable(String),
}

pub trait Extractor {
    /// Text of every page, in page order.
    fn pages(&self, path: &Path, password: Option<&str>) -> Result<Vec<String>, ExtractionError>;

    fn tables(&self, path: &Path, password: Option<&str>) -> Result<Vec<TableRegion>, ExtractionError> {
        Ok(detect_tables(&self.pages(path, password)?))
    }

    fn extract(
        &self,
        format: StatementFormat,
        path: &Path,
        password: Option<&str>,
    ) -> Result<Extracted, ExtractionError> {
        if format.uses_tables() {
            self.tables(path, password).map(Extracted::Tables)
        } else {
            self.pages(path, password).map(Extracted::Pages)
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

#[cfg(feature = "pdf")]
fn is_decryption_error(e: &pdf_extract::OutputError) -> bool {
    matches!(e, pdf_extract::OutputError::PdfError(pdf_extract::Error::Decryption(_)))
}

/// Documents that open with the empty user password (owner-password-only
/// statements) are read without asking; a supplied password is used only
/// when that fails.
#[cfg(feature = "pdf")]
fn read_pages(bytes: &[u8], password: Option<&str>) -> Result<Vec<String>, ExtractionError> {
    match pdf_extract::extract_text_from_mem_by_pages(bytes) {
        Ok(pages) => Ok(pages),
        Err(e) if is_decryption_error(&e) => {
            let Some(pw) = password else {
                return Err(ExtractionError::PasswordRequired);
            };
            pdf_extract::extract_text_from_mem_by_pages_encrypted(bytes, pw).map_err(|e| {
                if is_decryption_error(&e) {
                    ExtractionError::WrongPassword
                } else {
                    ExtractionError::Unreadable(format!("{e:?}"))
                }
            })
        }
        Err(e) => Err(ExtractionError::Unreadable(format!("{e:?}"))),
    }
}

impl Extractor for PdfTextExtractor {
    #[cfg(feature = "pdf")]
    fn pages(&self, path: &Path, password: Option<&str>) -> Result<Vec<String>, ExtractionError> {
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

        // pdf-extract panics on some malformed documents; keep that contained
        // to the one file.
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| read_pages(&bytes, password)));
        match result {
            Ok(pages) => pages.map(drop_trailing_blank),
            Err(_) => Err(ExtractionError::Unreadable("extractor panicked".to_string())),
        }
    }

    #[cfg(not(feature = "pdf"))]
    fn pages(&self, _path: &Path, _password: Option<&str>) -> Result<Vec<String>, ExtractionError> {
        Err(ExtractionError::Unreadable("built without PDF support".to_string()))
    }
}

#[cfg_attr(not(feature = "pdf"), allow(dead_code))]
fn drop_trailing_blank(mut pages: Vec<String>) -> Vec<String> {
    while pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

// ---------------------------------------------------------------------------
// Table detection
// ---------------------------------------------------------------------------

const MIN_COLUMNS: usize = 3;
const MIN_RULE_LEN: usize = 5;

/// Cells of a line with their starting character offset. Cells are separated
/// by runs of two or more whitespace characters.
pub fn split_cells(line: &str) -> Vec<(usize, String)> {
    let chars: Vec<char> = line.chars().collect();
    let mut cells = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i].is_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while i < chars.len() {
            if chars[i].is_whitespace() {
                let gap_end = chars[i..]
                    .iter()
                    .position(|c| !c.is_whitespace())
                    .map_or(chars.len(), |p| i + p);
                if gap_end - i >= 2 || gap_end == chars.len() {
                    break;
                }
                i = gap_end;
            } else {
                i += 1;
                end = i;
            }
        }
        cells.push((start, chars[start..end].iter().collect()));
    }
    cells
}

fn is_rule(line: &str) -> bool {
    let t = line.trim();
    t.chars().count() >= MIN_RULE_LEN
        && t.chars().all(|c| matches!(c, '-' | '_' | '=' | '+' | '|' | '─' | '━' | ' '))
}

fn is_multi_column(line: &str) -> bool {
    !is_rule(line) && split_cells(line).len() >= MIN_COLUMNS
}

fn bounding_region(lines: &[&str], top: usize, bottom: usize) -> Region {
    let mut left = usize::MAX;
    let mut right = 0;
    for line in &lines[top..bottom] {
        if let Some((start, _)) = split_cells(line).first() {
            left = left.min(*start);
        }
        right = right.max(line.trim_end().chars().count());
    }
    Region {
        top,
        bottom,
        left: if left == usize::MAX { 0 } else { left },
        right,
    }
}

/// Maximal runs of multi-column lines inside `lines[from..to]`, letting
/// wrapped single-cell lines sit between them.
fn aligned_runs(lines: &[&str], from: usize, to: usize) -> Vec<Region> {
    let mut regions = Vec::new();
    let mut i = from;
    while i < to {
        if !is_multi_column(lines[i]) {
            i += 1;
            continue;
        }
        let top = i;
        let mut bottom = i + 1;
        let mut j = i + 1;
        while j < to {
            if is_multi_column(lines[j]) {
                bottom = j + 1;
            } else if lines[j].trim().is_empty() || is_rule(lines[j]) {
                break;
            }
            j += 1;
        }
        regions.push(bounding_region(lines, top, bottom));
        i = bottom;
    }
    regions
}

/// First pass: bounding regions of the tables on one page.
///
/// With two or more ruling lines, every span between consecutive rules that
/// holds a multi-column line is a region. The open spans above the first
/// rule and below the last one fall back to aligned runs, which covers a
/// ruled header over unruled rows.
pub fn detect_regions(page: &str) -> Vec<Region> {
    let lines: Vec<&str> = page.lines().collect();
    let rules: Vec<usize> = (0..lines.len()).filter(|&i| is_rule(lines[i])).collect();

    if rules.len() < 2 {
        return aligned_runs(&lines, 0, lines.len());
    }
    let (first, last) = (rules[0], rules[rules.len() - 1]);

    let mut regions = aligned_runs(&lines, 0, first);
    for pair in rules.windows(2) {
        let (top, bottom) = (pair[0] + 1, pair[1]);
        if (top..bottom).any(|i| is_multi_column(lines[i])) {
            regions.push(bounding_region(&lines, top, bottom));
        }
    }
    regions.extend(aligned_runs(&lines, last + 1, lines.len()));
    regions
}

fn nearest_column(anchors: &[usize], offset: usize) -> usize {
    anchors
        .iter()
        .enumerate()
        .min_by_key(|(_, a)| a.abs_diff(offset))
        .map_or(0, |(idx, _)| idx)
}

fn append_cell(cell: &mut String, text: &str) {
    if !cell.is_empty() {
        cell.push(' ');
    }
    cell.push_str(text);
}

/// Second pass: split the lines of one region into rows of cells aligned to
/// the column offsets of the widest line.
pub fn extract_region(page: &str, region: Region) -> Vec<Vec<String>> {
    let lines: Vec<&str> = page
        .lines()
        .skip(region.top)
        .take(region.bottom.saturating_sub(region.top))
        .filter(|l| !l.trim().is_empty() && !is_rule(l))
        .collect();

    let anchors: Vec<usize> = lines
        .iter()
        .map(|l| split_cells(l))
        .max_by_key(|cells| cells.len())
        .map(|cells| cells.into_iter().map(|(start, _)| start).collect())
        .unwrap_or_default();
    if anchors.is_empty() {
        return Vec::new();
    }

    let mut rows: Vec<Vec<String>> = Vec::new();
    for line in lines {
        let cells = split_cells(line);
        if cells.len() == 1 {
            if let Some(prev) = rows.last_mut() {
                let (offset, text) = &cells[0];
                append_cell(&mut prev[nearest_column(&anchors, *offset)], text);
                continue;
            }
        }
        let mut row = vec![String::new(); anchors.len()];
        for (offset, text) in &cells {
            append_cell(&mut row[nearest_column(&anchors, *offset)], text);
        }
        rows.push(row);
    }
    rows
}

pub fn detect_tables(pages: &[String]) -> Vec<TableRegion> {
    pages
        .iter()
        .enumerate()
        .flat_map(|(idx, page)| {
            detect_regions(page).into_iter().map(move |bbox| {
                let region = TableRegion {
                    page: idx + 1,
                    bbox,
                    rows: extract_region(page, bbox),
                };
                tracing::debug!(
                    "page {}: table at lines {}..{}, columns {}..{}, {} rows",
                    region.page,
                    region.bbox.top,
                    region.bbox.bottom,
                    region.bbox.left,
                    region.bbox.right,
                    region.rows.len()
                );
                region
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = "\
HDFC Bank Credit Card Statement
Statement Date 20/03/2024

-----------------------------------------------------------------
Date                  Transaction Description      Points  Amount
-----------------------------------------------------------------
12/03/2024 18:22:10   FLIPKART INTERNET            24      2,499.00
                      PVT LTD
15/03/2024 09:01:55   NETBANKING PAYMENT                   5,000.00 Cr
-----------------------------------------------------------------
Page 1 of 2
";

    #[test]
    fn test_split_cells_on_wide_gaps() {
        let cells = split_cells("12/03/2024 18:22:10   FLIPKART INTERNET   24");
        assert_eq!(
            cells,
            vec![
                (0, "12/03/2024 18:22:10".to_string()),
                (22, "FLIPKART INTERNET".to_string()),
                (42, "24".to_string()),
            ]
        );
        assert!(split_cells("   ").is_empty());
    }

    #[test]
    fn test_trailing_blank_pages_are_dropped() {
        let pages = vec!["one".to_string(), "two".to_string(), " \n".to_string()];
        assert_eq!(drop_trailing_blank(pages), vec!["one", "two"]);
        assert!(drop_trailing_blank(Vec::new()).is_empty());
    }

    #[test]
    fn test_detect_regions_between_rules() {
        let regions = detect_regions(PAGE);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].top, regions[0].bottom), (4, 5));
        assert_eq!((regions[1].top, regions[1].bottom), (6, 9));
    }

    #[test]
    fn test_extract_region_folds_continuation_lines() {
        let regions = detect_regions(PAGE);
        let rows = extract_region(PAGE, regions[1]);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "12/03/2024 18:22:10");
        assert_eq!(rows[0][1], "FLIPKART INTERNET PVT LTD");
        assert_eq!(rows[0][3], "2,499.00");
        assert_eq!(rows[1][1], "NETBANKING PAYMENT");
        assert_eq!(rows[1][2], "");
        assert_eq!(rows[1][3], "5,000.00 Cr");
    }

    #[test]
    fn test_unruled_page_uses_aligned_runs() {
        let page = "\
Summary line
01/01/2024 10:00:00   SHOP ONE     1     10.00
02/01/2024 11:00:00   SHOP TWO     2     20.00

Footer";
        let tables = detect_tables(&[page.to_string()]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].page, 1);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1][1], "SHOP TWO");
    }

    #[test]
    fn test_ruled_header_over_unruled_rows() {
        let page = "\
Statement for March
-----------------------------------------------------------------
Date                  Transaction Description      Points  Amount
-----------------------------------------------------------------
12/03/2024 18:22:10   FLIPKART INTERNET            24      2,499.00
14/03/2024 20:05:41   SWIGGY BANGALORE             3       385.50

Page 1 of 1
";
        let regions = detect_regions(page);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[1].top, regions[1].bottom), (4, 6));

        let tables = detect_tables(&[page.to_string()]);
        let report = crate::formats::table_region::filter(&tables);
        assert_eq!(report.records.len(), 2);
        assert_eq!(report.records[0].description, "FLIPKART INTERNET");
        assert_eq!(report.records[1].amount_text, "385.50");
    }

    #[test]
    fn test_rows_above_first_rule_are_kept() {
        let page = "\
01/04/2024 08:00:00   METRO CARD     0     200.00
-----------------------------------------------
Closing balance    as of 30/04/2024    0.00
-----------------------------------------------
";
        let regions = detect_regions(page);
        assert_eq!(regions.len(), 2);
        assert_eq!((regions[0].top, regions[0].bottom), (0, 1));
    }

    #[test]
    fn test_tables_keep_their_page_number() {
        let first = "01/01/2024 10:00:00   SHOP ONE     1     10.00\n";
        let second = "02/01/2024 11:00:00   SHOP TWO     2     20.00\n";
        let tables = detect_tables(&[first.to_string(), second.to_string()]);
        assert_eq!(tables.iter().map(|t| t.page).collect::<Vec<_>>(), vec![1, 2]);
    }

    struct FailingExtractor;

    impl Extractor for FailingExtractor {
        fn pages(&self, _: &Path, _: Option<&str>) -> Result<Vec<String>, ExtractionError> {
            Err(ExtractionError::WrongPassword)
        }
    }

    #[test]
    fn test_extract_propagates_errors() {
        let err = FailingExtractor
            .extract(StatementFormat::TableRegionFiltered, Path::new("x.pdf"), Some("pw"))
            .unwrap_err();
        assert_eq!(err, ExtractionError::WrongPassword);
    }

    #[cfg(feature = "pdf")]
    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_extractor_reports_unreadable_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = PdfTextExtractor.pages(&dir.path().join("missing.pdf"), None);
        assert!(matches!(missing, Err(ExtractionError::Unreadable(_))));

        let junk = dir.path().join("junk.pdf");
        std::fs::write(&junk, b"%PDF-1.4\n/Encrypt 5 0 R\n").unwrap();
        assert!(matches!(
            PdfTextExtractor.pages(&junk, None),
            Err(ExtractionError::Unreadable(_))
        ));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_pdf_extractor_returns_one_entry_per_page() {
        // The document info mentions /Encrypt but the file is not encrypted.
        let pages = PdfTextExtractor.pages(&fixture("two_pages.pdf"), None).unwrap();
        assert_eq!(pages.len(), 2);
        assert!(pages[0].contains("PAGEONE"));
        assert!(pages[1].contains("PAGETWO"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_owner_password_only_pdf_opens_without_password() {
        let pages = PdfTextExtractor.pages(&fixture("owner_only.pdf"), None).unwrap();
        assert!(pages[0].contains("OWNERLOCKED"));

        let pages = PdfTextExtractor.pages(&fixture("owner_only.pdf"), Some("unused")).unwrap();
        assert!(pages[0].contains("OWNERLOCKED"));
    }

    #[cfg(feature = "pdf")]
    #[test]
    fn test_user_password_pdf_needs_the_right_password() {
        let path = fixture("user_password.pdf");
        assert_eq!(PdfTextExtractor.pages(&path, None), Err(ExtractionError::PasswordRequired));
        assert_eq!(PdfTextExtractor.pages(&path, Some("wrong")), Err(ExtractionError::WrongPassword));
        let pages = PdfTextExtractor.pages(&path, Some("secret")).unwrap();
        assert!(pages[0].contains("USERLOCKED"));
    }
}
