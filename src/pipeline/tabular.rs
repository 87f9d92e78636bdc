use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{CanonicalRecord, DocumentType};
use crate::error::Result;
use crate::pipeline::aliases::{AliasTable, Column};
use crate::pipeline::resolver::parse_amount_str;

/// Position-mode lines below this field count cannot carry a viable record.
const MIN_POSITION_FIELDS: usize = 8;

/// Header mode: comma-delimited input whose first row names the columns.
///
/// Column names are reconciled through the alias table; canonical fields
/// with no matching header stay at their defaults. Rows are independent:
/// a row the reader cannot decode is logged and skipped, and numeric parse
/// failures inside a row degrade to 0.0 rather than dropping the row.
pub fn normalize_header_rows(
    input: &str,
    aliases: &AliasTable,
    source_file: &str,
) -> Result<Vec<CanonicalRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(input.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let header_refs: Vec<&str> = headers.iter().map(|h| h.as_str()).collect();
    let bindings = aliases.bind(&header_refs);
    debug!(
        file = source_file,
        bound = bindings.len(),
        columns = headers.len(),
        "bound tabular headers"
    );

    let mut records = Vec::new();
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!(file = source_file, error = %e, "skipping undecodable row");
                continue;
            }
        };
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        // Audit payload: the row as parsed, keyed by its own headers
        let mut payload = Map::new();
        for (idx, header) in headers.iter().enumerate() {
            payload.insert(
                header.clone(),
                Value::String(row.get(idx).unwrap_or("").to_string()),
            );
        }

        let mut record = CanonicalRecord::empty(
            DocumentType::from_token(cell(&row, &bindings, Column::DocumentType)),
            source_file,
            Value::Object(payload),
        );
        record.document_number = cell(&row, &bindings, Column::DocumentNumber).to_string();
        record.issue_date = cell(&row, &bindings, Column::IssueDate).to_string();
        record.issuer_tax_id = cell(&row, &bindings, Column::IssuerTaxId).to_string();
        record.issuer_name = cell(&row, &bindings, Column::IssuerName).to_string();
        record.receiver_tax_id = cell(&row, &bindings, Column::ReceiverTaxId).to_string();
        record.receiver_name = cell(&row, &bindings, Column::ReceiverName).to_string();
        record.subtotal = parse_amount_str(cell(&row, &bindings, Column::Subtotal));
        record.tax = parse_amount_str(cell(&row, &bindings, Column::Tax));
        record.total = parse_amount_str(cell(&row, &bindings, Column::Total));
        records.push(record);
    }
    Ok(records)
}

/// Cell of the row bound to a canonical column, or `""` when unbound.
fn cell<'a>(
    row: &'a csv::StringRecord,
    bindings: &std::collections::HashMap<Column, usize>,
    column: Column,
) -> &'a str {
    bindings
        .get(&column)
        .and_then(|&idx| row.get(idx))
        .unwrap_or("")
        .trim()
}

/// Position mode: pipe-delimited lines with no header and a fixed field
/// order: type, number, date, issuer tax id, issuer name, receiver tax id,
/// receiver name, total, subtotal, tax.
///
/// Lines with fewer than eight fields are silently discarded. The type is
/// never inferred from content; a blank first column defaults to invoice.
pub fn normalize_position_lines(input: &str, source_file: &str) -> Vec<CanonicalRecord> {
    let mut records = Vec::new();
    for line in input.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').map(|f| f.trim()).collect();
        if fields.len() < MIN_POSITION_FIELDS {
            debug!(
                file = source_file,
                fields = fields.len(),
                "discarding short position-mode line"
            );
            continue;
        }
        let field = |idx: usize| fields.get(idx).copied().unwrap_or("");

        let payload = Value::Array(
            fields
                .iter()
                .map(|f| Value::String(f.to_string()))
                .collect(),
        );
        let mut record = CanonicalRecord::empty(
            DocumentType::from_token(field(0)),
            source_file,
            payload,
        );
        record.document_number = field(1).to_string();
        record.issue_date = field(2).to_string();
        record.issuer_tax_id = field(3).to_string();
        record.issuer_name = field(4).to_string();
        record.receiver_tax_id = field(5).to_string();
        record.receiver_name = field(6).to_string();
        record.total = parse_amount_str(field(7));
        record.subtotal = parse_amount_str(field(8));
        record.tax = parse_amount_str(field(9));
        records.push(record);
    }
    records
}
