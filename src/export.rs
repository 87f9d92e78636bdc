use chrono::Utc;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use crate::domain::CanonicalRecord;
use crate::error::{IngestError, Result};

const ROWS_PER_PAGE: usize = 48;

const SPREADSHEET_HEADER: [&str; 10] = [
    "tipo",
    "numero",
    "fecha",
    "ruc_emisor",
    "razon_social_emisor",
    "ruc_receptor",
    "razon_social_receptor",
    "subtotal",
    "iva",
    "total",
];

/// Render an ordered list of records as a spreadsheet byte stream.
/// Values cross this boundary raw; no currency or date formatting.
pub fn spreadsheet_bytes(records: &[CanonicalRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(SPREADSHEET_HEADER)?;
    for record in records {
        writer.write_record(&[
            record.document_type.as_str().to_string(),
            record.document_number.clone(),
            record.issue_date.clone(),
            record.issuer_tax_id.clone(),
            record.issuer_name.clone(),
            record.receiver_tax_id.clone(),
            record.receiver_name.clone(),
            record.subtotal.to_string(),
            record.tax.to_string(),
            record.total.to_string(),
        ])?;
    }
    writer
        .into_inner()
        .map_err(|e| IngestError::Render(e.to_string()))
}

/// Render the same tabular shape as a PDF byte stream, with a title and
/// generation timestamp.
pub fn pdf_bytes(records: &[CanonicalRecord]) -> Result<Vec<u8>> {
    let mut lines = vec![
        "Comprobantes".to_string(),
        format!("Generado: {}", Utc::now().to_rfc3339()),
        String::new(),
        format!(
            "{:<12} {:<14} {:<11} {:<14} {:<20} {:<14} {:<20} {:>10} {:>8} {:>10}",
            "tipo",
            "numero",
            "fecha",
            "ruc_emisor",
            "emisor",
            "ruc_receptor",
            "receptor",
            "subtotal",
            "iva",
            "total"
        ),
    ];
    for record in records {
        lines.push(format!(
            "{:<12} {:<14} {:<11} {:<14} {:<20} {:<14} {:<20} {:>10} {:>8} {:>10}",
            record.document_type.as_str(),
            record.document_number,
            record.issue_date,
            record.issuer_tax_id,
            truncated(&record.issuer_name, 20),
            record.receiver_tax_id,
            truncated(&record.receiver_name, 20),
            record.subtotal,
            record.tax,
            record.total,
        ));
    }

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut page_ids: Vec<Object> = Vec::new();
    for chunk in lines.chunks(ROWS_PER_PAGE) {
        let content = Content {
            operations: page_operations(chunk),
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        page_ids.push(page_id.into());
    }

    let page_count = page_ids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => page_ids,
            "Count" => page_count,
            "Resources" => resources_id,
            // US Letter, landscape, to fit the table width
            "MediaBox" => vec![0.into(), 0.into(), 792.into(), 612.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn page_operations(lines: &[String]) -> Vec<Operation> {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), 7.into()]),
        Operation::new("TL", vec![11.into()]),
        Operation::new("Td", vec![24.into(), 580.into()]),
    ];
    for line in lines {
        operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(line.as_str())],
        ));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    operations
}

fn truncated(name: &str, max: usize) -> String {
    name.chars().take(max).collect()
}
