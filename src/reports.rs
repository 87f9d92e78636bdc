use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::domain::{CanonicalRecord, DocumentType};
use crate::error::Result;

const TOP_ISSUERS_LIMIT: usize = 10;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeTotals {
    pub document_type: DocumentType,
    pub count: usize,
    pub total_sum: f64,
    pub total_avg: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyBucket {
    /// Year-month prefix of the issue date, e.g. "2024-01"
    pub month: String,
    pub document_type: DocumentType,
    pub count: usize,
    pub total_sum: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopIssuer {
    pub issuer_tax_id: String,
    pub issuer_name: String,
    pub count: usize,
    pub total_sum: f64,
}

/// The three canned reports, computed independently over the same record
/// set. A report that fails leaves its slot empty and its reason in
/// `report_errors`; the others still complete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryReport {
    pub totals_by_type: Option<Vec<TypeTotals>>,
    pub monthly_series: Option<Vec<MonthlyBucket>>,
    pub top_issuers: Option<Vec<TopIssuer>>,
    pub report_errors: Vec<String>,
}

impl SummaryReport {
    pub fn build(records: &[CanonicalRecord]) -> SummaryReport {
        let mut report_errors = Vec::new();

        let totals_by_type = match totals_by_type(records) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "totals-by-type report failed");
                report_errors.push(format!("totalsByType: {e}"));
                None
            }
        };
        let monthly_series = match monthly_series(records) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "monthly-series report failed");
                report_errors.push(format!("monthlySeries: {e}"));
                None
            }
        };
        let top_issuers = match top_issuers(records) {
            Ok(rows) => Some(rows),
            Err(e) => {
                warn!(error = %e, "top-issuers report failed");
                report_errors.push(format!("topIssuers: {e}"));
                None
            }
        };

        SummaryReport {
            totals_by_type,
            monthly_series,
            top_issuers,
            report_errors,
        }
    }
}

/// Group by document type: count, sum(total), average(total).
pub fn totals_by_type(records: &[CanonicalRecord]) -> Result<Vec<TypeTotals>> {
    let mut groups: HashMap<DocumentType, (usize, f64)> = HashMap::new();
    for record in records {
        let entry = groups.entry(record.document_type).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.total;
    }

    let mut rows: Vec<TypeTotals> = groups
        .into_iter()
        .map(|(document_type, (count, total_sum))| TypeTotals {
            document_type,
            count,
            total_sum,
            total_avg: total_sum / count as f64,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_sum
            .partial_cmp(&a.total_sum)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(rows)
}

/// Group by (year-month, document type): count and sum(total), month
/// descending. Records with an empty issue date are excluded.
pub fn monthly_series(records: &[CanonicalRecord]) -> Result<Vec<MonthlyBucket>> {
    let mut groups: HashMap<(String, DocumentType), (usize, f64)> = HashMap::new();
    for record in records {
        let Some(month) = year_month(&record.issue_date) else {
            continue;
        };
        let entry = groups
            .entry((month, record.document_type))
            .or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += record.total;
    }

    let mut rows: Vec<MonthlyBucket> = groups
        .into_iter()
        .map(|((month, document_type), (count, total_sum))| MonthlyBucket {
            month,
            document_type,
            count,
            total_sum,
        })
        .collect();
    rows.sort_by(|a, b| b.month.cmp(&a.month));
    Ok(rows)
}

/// Group by issuer tax id (empty ids excluded): document count and
/// sum(total), ordered by sum descending, truncated to the top ten.
pub fn top_issuers(records: &[CanonicalRecord]) -> Result<Vec<TopIssuer>> {
    let mut groups: HashMap<String, (String, usize, f64)> = HashMap::new();
    for record in records {
        if record.issuer_tax_id.is_empty() {
            continue;
        }
        let entry = groups
            .entry(record.issuer_tax_id.clone())
            .or_insert_with(|| (record.issuer_name.clone(), 0, 0.0));
        if entry.0.is_empty() && !record.issuer_name.is_empty() {
            entry.0 = record.issuer_name.clone();
        }
        entry.1 += 1;
        entry.2 += record.total;
    }

    let mut rows: Vec<TopIssuer> = groups
        .into_iter()
        .map(|(issuer_tax_id, (issuer_name, count, total_sum))| TopIssuer {
            issuer_tax_id,
            issuer_name,
            count,
            total_sum,
        })
        .collect();
    rows.sort_by(|a, b| {
        b.total_sum
            .partial_cmp(&a.total_sum)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows.truncate(TOP_ISSUERS_LIMIT);
    Ok(rows)
}

/// Extract the "YYYY-MM" prefix of an ISO-8601 date string; None for dates
/// too short to carry one.
fn year_month(issue_date: &str) -> Option<String> {
    issue_date.get(..7).map(|prefix| prefix.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(
        document_type: DocumentType,
        date: &str,
        issuer: &str,
        total: f64,
    ) -> CanonicalRecord {
        let mut record = CanonicalRecord::empty(document_type, "test.xml", json!({}));
        record.issue_date = date.to_string();
        record.issuer_tax_id = issuer.to_string();
        record.total = total;
        record
    }

    #[test]
    fn test_totals_by_type() {
        let records = vec![
            record(DocumentType::Invoice, "2024-01-05", "0999", 10.0),
            record(DocumentType::Invoice, "2024-01-06", "0999", 20.0),
            record(DocumentType::CreditNote, "2024-01-07", "0999", 5.0),
        ];
        let rows = totals_by_type(&records).unwrap();

        assert_eq!(rows.len(), 2);
        let invoices = rows
            .iter()
            .find(|r| r.document_type == DocumentType::Invoice)
            .unwrap();
        assert_eq!(invoices.count, 2);
        assert_eq!(invoices.total_sum, 30.0);
        assert_eq!(invoices.total_avg, 15.0);
    }

    #[test]
    fn test_monthly_series_excludes_empty_dates_and_sorts_descending() {
        let records = vec![
            record(DocumentType::Invoice, "2024-01-05", "0999", 10.0),
            record(DocumentType::Invoice, "2024-02-01", "0999", 20.0),
            record(DocumentType::Invoice, "", "0999", 99.0),
        ];
        let rows = monthly_series(&records).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].month, "2024-02");
        assert_eq!(rows[1].month, "2024-01");
        assert_eq!(rows[0].total_sum, 20.0);
    }

    #[test]
    fn test_top_issuers_ranks_by_total_sum() {
        let records = vec![
            record(DocumentType::Invoice, "2024-01-05", "0999", 11.20),
            record(DocumentType::Invoice, "2024-01-06", "0999", 11.20),
            record(DocumentType::Invoice, "2024-01-07", "0999", 11.20),
            record(DocumentType::Invoice, "2024-01-08", "0888", 10.00),
            record(DocumentType::Invoice, "2024-01-09", "0888", 10.00),
            record(DocumentType::Invoice, "2024-01-10", "", 500.00),
        ];
        let rows = top_issuers(&records).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].issuer_tax_id, "0999");
        assert!((rows[0].total_sum - 33.60).abs() < 1e-9);
        assert_eq!(rows[0].count, 3);
        assert_eq!(rows[1].issuer_tax_id, "0888");
        assert_eq!(rows[1].total_sum, 20.00);
    }

    #[test]
    fn test_top_issuers_truncates_to_ten() {
        let records: Vec<CanonicalRecord> = (0..15)
            .map(|i| {
                record(
                    DocumentType::Invoice,
                    "2024-01-05",
                    &format!("{i:013}"),
                    i as f64,
                )
            })
            .collect();
        let rows = top_issuers(&records).unwrap();
        assert_eq!(rows.len(), 10);
        assert_eq!(rows[0].total_sum, 14.0);
    }

    #[test]
    fn test_summary_report_combines_all_three() {
        let records = vec![record(DocumentType::Invoice, "2024-01-05", "0999", 10.0)];
        let report = SummaryReport::build(&records);

        assert!(report.totals_by_type.is_some());
        assert!(report.monthly_series.is_some());
        assert!(report.top_issuers.is_some());
        assert!(report.report_errors.is_empty());
    }
}
