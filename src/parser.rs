use crate::error::Result;
use crate::extract::Extractor;
use crate::formats::{Extracted, FormatConfig, ScanReport, StatementFormat};
use crate::models::{Issuer, NormalizedTable, RawRecord, StatementFile, SummaryRow, Transaction};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Amounts marked `Cr` (any case) are credits/refunds and never enter the
/// debit ledger.
pub fn is_credit(amount_text: &str) -> bool {
    amount_text.to_ascii_lowercase().contains("cr")
}

pub fn parse_amount(raw: &str) -> Option<f64> {
    let s = raw.replace(',', "");
    let value: f64 = s.trim().parse().ok()?;
    value.is_finite().then_some(value.abs())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

fn to_transaction(record: &RawRecord) -> Option<Transaction> {
    let Some(amount) = parse_amount(&record.amount_text) else {
        tracing::warn!(
            "dropping {:?} on {}: amount {:?} is not a number",
            record.description,
            record.date,
            record.amount_text
        );
        return None;
    };
    Some(Transaction {
        date: record.date.clone(),
        description: record.description.clone(),
        amount,
        card: record.card.clone(),
        kind: record.kind.clone(),
    })
}

/// Turn reconstructed records into the final table: credits dropped, amounts
/// coerced, per-card subtotals (for card-sectioned layouts) and a grand total
/// appended.
pub fn normalize(issuer: Issuer, sheet_name: &str, records: &[RawRecord], config: &FormatConfig) -> NormalizedTable {
    let mut table = NormalizedTable::empty(issuer, sheet_name);
    table.transactions = records
        .iter()
        .filter(|r| !is_credit(&r.amount_text))
        .filter_map(to_transaction)
        .collect();

    let mut cards: Vec<&str> = Vec::new();
    if issuer.format() == StatementFormat::CardSectioned {
        for marker in &config.card_markers {
            if !cards.contains(&marker.card.as_str()) {
                cards.push(&marker.card);
            }
        }
    }

    for card in &cards {
        let subtotal: f64 = table
            .transactions
            .iter()
            .filter(|t| t.card.as_deref() == Some(*card))
            .map(|t| t.amount)
            .sum();
        table.summaries.push(SummaryRow {
            label: format!("Total - {card}"),
            amount: round_cents(subtotal),
        });
    }

    let total: f64 = table.transactions.iter().map(|t| t.amount).sum();
    table.summaries.push(SummaryRow {
        label: if cards.is_empty() { "Total" } else { "Net Total" }.to_string(),
        amount: round_cents(total),
    });
    table
}

fn log_diagnostics(file: &StatementFile, report: &ScanReport) {
    for diag in &report.diagnostics {
        tracing::warn!("{} {}: {diag}", file.issuer, file.file_name());
    }
}

// ---------------------------------------------------------------------------
// Statement parsing
// ---------------------------------------------------------------------------

pub struct ParsedStatement {
    /// Empty whenever extraction failed.
    pub table: NormalizedTable,
    /// What the extractor returned, or why it failed.
    pub extracted: Result<Extracted>,
}

fn reconstruct(file: &StatementFile, extracted: &Extracted, settings: &Settings) -> NormalizedTable {
    let format = file.issuer.format();
    let config = FormatConfig::from(settings);
    let report = format.reconstruct(extracted, &config);
    log_diagnostics(file, &report);

    let table = normalize(file.issuer, &file.artifact_stem(), &report.records, &config);
    tracing::debug!(
        "{} {}: {} records reconstructed, {} kept",
        file.issuer,
        file.file_name(),
        report.records.len(),
        table.transactions.len()
    );
    table
}

/// Extract, reconstruct and normalize one statement. A failed extraction is
/// logged and yields an empty table, with the cause kept in `extracted`.
pub fn parse_statement(file: &StatementFile, extractor: &dyn Extractor, settings: &Settings) -> ParsedStatement {
    match extractor.extract(file.issuer.format(), &file.path, file.password.as_deref()) {
        Ok(extracted) => ParsedStatement {
            table: reconstruct(file, &extracted, settings),
            extracted: Ok(extracted),
        },
        Err(e) => {
            tracing::warn!("{} {}: {e}", file.issuer, file.file_name());
            ParsedStatement {
                table: NormalizedTable::empty(file.issuer, &file.artifact_stem()),
                extracted: Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::error::StmtError;
    use crate::extract::ExtractionError;
    use crate::models::{Region, TableRegion};
    use crate::settings::default_card_markers;

    struct TextExtractor(&'static str);

    impl Extractor for TextExtractor {
        fn pages(&self, _: &Path, _: Option<&str>) -> std::result::Result<Vec<String>, ExtractionError> {
            Ok(vec![self.0.to_string()])
        }
    }

    struct LockedExtractor;

    impl Extractor for LockedExtractor {
        fn pages(&self, _: &Path, password: Option<&str>) -> std::result::Result<Vec<String>, ExtractionError> {
            match password {
                None => Err(ExtractionError::PasswordRequired),
                Some(_) => Err(ExtractionError::WrongPassword),
            }
        }
    }

    struct TableExtractor(Vec<TableRegion>);

    impl Extractor for TableExtractor {
        fn pages(&self, _: &Path, _: Option<&str>) -> std::result::Result<Vec<String>, ExtractionError> {
            Ok(Vec::new())
        }

        fn tables(&self, _: &Path, _: Option<&str>) -> std::result::Result<Vec<TableRegion>, ExtractionError> {
            Ok(self.0.clone())
        }
    }

    fn config() -> FormatConfig {
        FormatConfig {
            card_markers: default_card_markers(),
            section_header: "TRANSACTIONS FOR ROHIT KUMAR".to_string(),
        }
    }

    fn record(desc: &str, amount: &str, card: Option<&str>) -> RawRecord {
        RawRecord {
            date: "01/02/2024".to_string(),
            description: desc.to_string(),
            amount_text: amount.to_string(),
            card: card.map(str::to_string),
            kind: None,
        }
    }

    #[test]
    fn test_is_credit() {
        assert!(is_credit("500.00 Cr"));
        assert!(is_credit("500.00 CR"));
        assert!(is_credit("cr 12"));
        assert!(!is_credit("500.00"));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1,234.56"), Some(1234.56));
        assert_eq!(parse_amount(" 250.00 "), Some(250.0));
        assert_eq!(parse_amount("-42.50"), Some(42.5));
        assert_eq!(parse_amount(""), None);
        assert_eq!(parse_amount("nan"), None);
        assert_eq!(parse_amount("12 points"), None);
    }

    #[test]
    fn test_credit_is_excluded_from_rows_and_totals() {
        let records = vec![
            record("STARBUCKS COFFEE", "250.00", Some("Sapphiro")),
            record("REFUND", "500.00 Cr", Some("Sapphiro")),
            record("ZOMATO", "410.10", Some("Coral")),
        ];
        let table = normalize(Issuer::Icici, "ICICI_02_2024", &records, &config());
        assert_eq!(table.transactions.len(), 2);
        assert!(table.transactions.iter().all(|t| t.amount >= 0.0));
        assert_eq!(
            table.summaries,
            vec![
                SummaryRow { label: "Total - Sapphiro".to_string(), amount: 250.0 },
                SummaryRow { label: "Total - Coral".to_string(), amount: 410.1 },
                SummaryRow { label: "Net Total".to_string(), amount: 660.1 },
            ]
        );
    }

    #[test]
    fn test_single_total_for_non_card_layouts() {
        let records = vec![record("SWIGGY", "1,000.25", None), record("OLA", "bad", None)];
        let table = normalize(Issuer::Sbi, "SBI_02_2024", &records, &config());
        assert_eq!(table.transactions.len(), 1);
        assert_eq!(table.summaries, vec![SummaryRow { label: "Total".to_string(), amount: 1000.25 }]);
        assert_eq!(table.columns, vec!["Date", "Description", "Amount", "Type"]);

        let only_credits = normalize(Issuer::Sbi, "SBI_02_2024", &[record("REFUND", "9.00 Cr", None)], &config());
        assert!(only_credits.is_empty());
        assert_eq!(only_credits.summaries.len(), 1);
    }

    #[test]
    fn test_parse_five_and_six_line_records() {
        let text = "\
4501XXXXXXXX1003
01/02/2024
SERIAL1
STARBUCKS COFFEE
120
250.00
01/02/2024
SERIAL2
AMAZON
INDIA PVT LTD
50
1200.50
";
        let file = StatementFile::new(Issuer::Icici, Path::new("02_2024.pdf"), None);
        let table = parse_statement(&file, &TextExtractor(text), &Settings::default()).table;
        assert_eq!(table.sheet_name, "ICICI_02_2024");
        assert_eq!(table.transactions.len(), 2);
        assert_eq!(table.transactions[0].description, "STARBUCKS COFFEE");
        assert_eq!(table.transactions[0].amount, 250.0);
        assert_eq!(table.transactions[0].card.as_deref(), Some("Sapphiro"));
        assert_eq!(table.transactions[1].description, "AMAZON INDIA PVT LTD");
        assert_eq!(table.transactions[1].amount, 1200.5);
        assert_eq!(table.total(), 1450.5);
    }

    #[test]
    fn test_table_layout_end_to_end() {
        let regions = vec![TableRegion {
            page: 1,
            bbox: Region { top: 0, bottom: 2, left: 0, right: 80 },
            rows: vec![
                vec!["12/03/2024 18:22:10".into(), "FLIPKART".into(), "24".into(), "2,499.00".into()],
                vec!["15/03/2024 09:01:55".into(), "PAYMENT".into(), "".into(), "5,000.00 Cr".into()],
            ],
        }];
        let file = StatementFile::new(Issuer::Hdfc, Path::new("03_2024.pdf"), Some("pw"));
        let table = parse_statement(&file, &TableExtractor(regions), &Settings::default()).table;
        assert_eq!(table.transactions.len(), 1);
        assert_eq!(table.transactions[0].amount, 2499.0);
        assert_eq!(table.summaries.last().unwrap().label, "Total");
    }

    #[test]
    fn test_extraction_failure_yields_empty_table() {
        let file = StatementFile::new(Issuer::Sbi, Path::new("01_2024.pdf"), None);
        let parsed = parse_statement(&file, &LockedExtractor, &Settings::default());
        assert!(parsed.table.is_empty());
        assert_eq!(parsed.table.sheet_name, "SBI_01_2024");
        assert!(matches!(
            parsed.extracted,
            Err(StmtError::Extraction(ExtractionError::PasswordRequired))
        ));
    }
}
