use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The legally distinct document variants handled by the pipeline.
///
/// The set is closed: anything the normalizers cannot recognize is folded
/// into `Invoice` rather than rejected, so downstream reporting never sees
/// an unknown variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    #[serde(rename = "factura")]
    Invoice,
    #[serde(rename = "notaCredito")]
    CreditNote,
    #[serde(rename = "retencion")]
    Withholding,
}

impl DocumentType {
    /// Parse a source type token (markup root name, tabular type column).
    /// Blank and unrecognized tokens fall back to `Invoice`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "notacredito" | "nota_credito" | "nota de credito" | "nc" => DocumentType::CreditNote,
            "retencion" | "retención" | "comprobanteretencion" | "comprobante_retencion" => {
                DocumentType::Withholding
            }
            _ => DocumentType::Invoice,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Invoice => "factura",
            DocumentType::CreditNote => "notaCredito",
            DocumentType::Withholding => "retencion",
        }
    }
}

/// Processing status of a canonical record.
///
/// Only `Processed` is produced today; `rejected` and `pending` are reserved
/// for a future strict-validation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "processed")]
    Processed,
}

/// The unified, format-independent representation of one tax document.
///
/// Created exactly once per extracted document (markup) or row/line
/// (tabular), inserted immediately, never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Assigned by the store at insertion; None until then.
    pub id: Option<Uuid>,
    pub document_type: DocumentType,
    pub document_number: String,
    /// ISO-8601 date string as extracted; empty if unknown, never validated.
    pub issue_date: String,
    pub issuer_tax_id: String,
    pub issuer_name: String,
    pub receiver_tax_id: String,
    pub receiver_name: String,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
    pub status: RecordStatus,
    /// Provenance: original filename the record was extracted from.
    pub source_file: String,
    pub processed_at: DateTime<Utc>,
    /// The parsed input retained verbatim for audit; never interpreted
    /// after extraction.
    pub raw_payload: Value,
}

impl CanonicalRecord {
    /// A default-filled record carrying only provenance. Normalizers start
    /// from this and overwrite whatever their source actually provides.
    pub fn empty(document_type: DocumentType, source_file: &str, raw_payload: Value) -> Self {
        Self {
            id: None,
            document_type,
            document_number: String::new(),
            issue_date: String::new(),
            issuer_tax_id: String::new(),
            issuer_name: String::new(),
            receiver_tax_id: String::new(),
            receiver_name: String::new(),
            subtotal: 0.0,
            tax: 0.0,
            total: 0.0,
            status: RecordStatus::Processed,
            source_file: source_file.to_string(),
            processed_at: Utc::now(),
            raw_payload,
        }
    }
}
