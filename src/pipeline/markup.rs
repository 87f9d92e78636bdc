use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{CanonicalRecord, DocumentType};
use crate::error::{IngestError, Result};
use crate::pipeline::resolver::{number_at, string_at};

/// Canonical fields an extraction map can populate.
#[derive(Debug, Clone, Copy)]
enum Field {
    Number,
    IssueDate,
    IssuerTaxId,
    IssuerName,
    ReceiverTaxId,
    ReceiverName,
    Subtotal,
    Tax,
    Total,
}

/// One (canonical field, path-within-tree) extraction rule.
struct FieldPath {
    field: Field,
    path: &'static [&'static str],
}

const FACTURA_MAP: &[FieldPath] = &[
    FieldPath { field: Field::Number, path: &["infoTributaria", "secuencial"] },
    FieldPath { field: Field::IssueDate, path: &["infoFactura", "fechaEmision"] },
    FieldPath { field: Field::IssuerTaxId, path: &["infoTributaria", "ruc"] },
    FieldPath { field: Field::IssuerName, path: &["infoTributaria", "razonSocial"] },
    FieldPath { field: Field::ReceiverTaxId, path: &["infoFactura", "identificacionComprador"] },
    FieldPath { field: Field::ReceiverName, path: &["infoFactura", "razonSocialComprador"] },
    FieldPath { field: Field::Subtotal, path: &["infoFactura", "totalSinImpuestos"] },
    // Tax breakdown is a repeatable collection; the resolver takes the
    // first entry.
    FieldPath { field: Field::Tax, path: &["infoFactura", "totalConImpuestos", "totalImpuesto", "valor"] },
    FieldPath { field: Field::Total, path: &["infoFactura", "importeTotal"] },
];

// Credit notes carry no receiver block or tax breakdown; those fields stay
// at their defaults.
const NOTA_CREDITO_MAP: &[FieldPath] = &[
    FieldPath { field: Field::Number, path: &["infoTributaria", "secuencial"] },
    FieldPath { field: Field::IssueDate, path: &["infoNotaCredito", "fechaEmision"] },
    FieldPath { field: Field::IssuerTaxId, path: &["infoTributaria", "ruc"] },
    FieldPath { field: Field::IssuerName, path: &["infoTributaria", "razonSocial"] },
    FieldPath { field: Field::Total, path: &["infoNotaCredito", "valorModificacion"] },
];

const RETENCION_MAP: &[FieldPath] = &[
    FieldPath { field: Field::Number, path: &["infoTributaria", "secuencial"] },
    FieldPath { field: Field::IssueDate, path: &["infoCompRetencion", "fechaEmision"] },
    FieldPath { field: Field::IssuerTaxId, path: &["infoTributaria", "ruc"] },
    FieldPath { field: Field::IssuerName, path: &["infoTributaria", "razonSocial"] },
    FieldPath { field: Field::Total, path: &["impuestos", "impuesto", "valorRetenido"] },
];

/// Ordered variant dispatch table; first matching root key wins.
const VARIANT_ROOTS: &[(&str, DocumentType, &[FieldPath])] = &[
    ("factura", DocumentType::Invoice, FACTURA_MAP),
    ("notaCredito", DocumentType::CreditNote, NOTA_CREDITO_MAP),
    ("comprobanteRetencion", DocumentType::Withholding, RETENCION_MAP),
];

/// Parse a markup document into a JSON-shaped tree: `{root: {...}}`.
///
/// Repeated sibling elements become arrays, text-only elements become
/// strings, attributes are dropped. The shape mirrors what the extraction
/// maps and the audit trail expect.
pub fn parse_markup(input: &str) -> Result<Value> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    // Stack frame per open element: (name, child elements, text content)
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                stack.push((name, Map::new(), String::new()));
            }
            Event::Text(text) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&text.unescape()?);
                }
            }
            Event::CData(cdata) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Event::Empty(start) => {
                let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
                match stack.last_mut() {
                    Some((_, children, _)) => {
                        insert_child(children, name, Value::String(String::new()))
                    }
                    // Self-closing root, e.g. a bare `<factura/>`
                    None => {
                        let mut wrapper = Map::new();
                        wrapper.insert(name, Value::String(String::new()));
                        root = Some(Value::Object(wrapper));
                    }
                }
            }
            Event::End(_) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| IngestError::Parse("unbalanced closing tag".to_string()))?;
                let value = if children.is_empty() {
                    Value::String(text.trim().to_string())
                } else {
                    Value::Object(children)
                };
                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, value),
                    None => {
                        let mut wrapper = Map::new();
                        wrapper.insert(name, value);
                        root = Some(Value::Object(wrapper));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    root.ok_or_else(|| IngestError::Parse("document has no root element".to_string()))
}

/// Insert a child element, promoting repeated keys to arrays the way the
/// repeatable-element markup encoding requires.
fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            parent.insert(name, value);
        }
    }
}

/// Normalize a parsed markup tree into a canonical record.
///
/// The root key is matched against the known variant roots in order; an
/// unrecognized root treats the whole tree as an invoice-shaped document so
/// near-conforming but mislabeled documents still ingest. Extraction never
/// fails: absent structure degrades to field defaults.
pub fn normalize_markup(tree: &Value, source_file: &str) -> CanonicalRecord {
    for (root, document_type, map) in VARIANT_ROOTS {
        if let Some(body) = crate::pipeline::resolver::resolve(tree, &[*root]) {
            debug!(variant = *root, file = source_file, "matched markup variant");
            return extract(body, *document_type, map, source_file, tree.clone());
        }
    }

    // Tolerant fallback: unrecognized root shapes are read as invoices.
    debug!(file = source_file, "unrecognized markup root, treating as invoice");
    extract(tree, DocumentType::Invoice, FACTURA_MAP, source_file, tree.clone())
}

fn extract(
    body: &Value,
    document_type: DocumentType,
    map: &[FieldPath],
    source_file: &str,
    raw_payload: Value,
) -> CanonicalRecord {
    let mut record = CanonicalRecord::empty(document_type, source_file, raw_payload);
    for rule in map {
        match rule.field {
            Field::Number => record.document_number = string_at(body, rule.path),
            Field::IssueDate => record.issue_date = string_at(body, rule.path),
            Field::IssuerTaxId => record.issuer_tax_id = string_at(body, rule.path),
            Field::IssuerName => record.issuer_name = string_at(body, rule.path),
            Field::ReceiverTaxId => record.receiver_tax_id = string_at(body, rule.path),
            Field::ReceiverName => record.receiver_name = string_at(body, rule.path),
            Field::Subtotal => record.subtotal = number_at(body, rule.path),
            Field::Tax => record.tax = number_at(body, rule.path),
            Field::Total => record.total = number_at(body, rule.path),
        }
    }
    record
}
