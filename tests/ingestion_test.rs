use anyhow::Result;
use std::sync::Arc;

use comprobantes::domain::DocumentType;
use comprobantes::export;
use comprobantes::pipeline::aliases::AliasTable;
use comprobantes::pipeline::batch::{ingest_batch, SourceFile};
use comprobantes::reports::SummaryReport;
use comprobantes::storage::{InMemoryStorage, RecordQuery, Storage};

const FACTURA_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<factura>
  <infoTributaria>
    <ruc>0999999999001</ruc>
    <razonSocial>ACME S.A.</razonSocial>
    <secuencial>000000123</secuencial>
  </infoTributaria>
  <infoFactura>
    <fechaEmision>2024-01-05</fechaEmision>
    <identificacionComprador>0888888888</identificacionComprador>
    <razonSocialComprador>CLIENTE UNO</razonSocialComprador>
    <totalSinImpuestos>10.00</totalSinImpuestos>
    <totalConImpuestos>
      <totalImpuesto>
        <valor>1.20</valor>
      </totalImpuesto>
    </totalConImpuestos>
    <importeTotal>11.20</importeTotal>
  </infoFactura>
</factura>"#;

const ENERO_CSV: &str = "Tipo,Numero,RUC,Razon Social,Fecha,Total\n\
factura,001,0999999999001,ACME S.A.,2024-01-15,11.20\n\
notaCredito,002,0999999999001,ACME S.A.,2024-02-02,5.60\n";

const LOTE_TXT: &str = "\
factura|003|2024-01-20|0777777777001|OTRO EMISOR|0888888888|CLIENTE UNO|20.00|18.00|2.00\n\
retencion|004|2024-02-10|0777777777001|OTRO EMISOR|||3.50\n\
factura|corta|2024-02-11\n";

fn batch_files() -> Vec<SourceFile> {
    vec![
        SourceFile {
            name: "factura_123.xml".to_string(),
            contents: FACTURA_XML.as_bytes().to_vec(),
        },
        SourceFile {
            name: "enero.csv".to_string(),
            contents: ENERO_CSV.as_bytes().to_vec(),
        },
        SourceFile {
            name: "lote.txt".to_string(),
            contents: LOTE_TXT.as_bytes().to_vec(),
        },
    ]
}

#[tokio::test]
async fn test_full_pipeline_from_files_to_reports() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    let aliases = AliasTable::builtin();

    let summary = ingest_batch(storage.clone(), &aliases, batch_files()).await;
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 0);
    // 1 markup + 2 csv rows + 2 txt lines (the short line is discarded)
    assert_eq!(summary.outcomes[0].records, 1);
    assert_eq!(summary.outcomes[1].records, 2);
    assert_eq!(summary.outcomes[2].records, 2);

    let all = storage.all_records().await?;
    assert_eq!(all.len(), 5);
    assert!(all.iter().all(|r| r.id.is_some()));
    assert!(all.iter().all(|r| !r.total.is_nan()));

    // Filtered, ordered, limited scan: invoices of January 2024
    let query = RecordQuery {
        document_type: Some(DocumentType::Invoice),
        issue_date_from: Some("2024-01-01".to_string()),
        issue_date_to: Some("2024-01-31".to_string()),
        limit: Some(10),
        ..RecordQuery::default()
    };
    let invoices = storage.scan_records(&query).await?;
    assert_eq!(invoices.len(), 3);
    assert!(invoices
        .iter()
        .all(|r| r.document_type == DocumentType::Invoice));
    let dates: Vec<&str> = invoices.iter().map(|r| r.issue_date.as_str()).collect();
    assert_eq!(dates, vec!["2024-01-20", "2024-01-15", "2024-01-05"]);

    // The combined report object
    let report = SummaryReport::build(&all);
    assert!(report.report_errors.is_empty());

    let totals = report.totals_by_type.unwrap();
    let invoice_totals = totals
        .iter()
        .find(|t| t.document_type == DocumentType::Invoice)
        .unwrap();
    assert_eq!(invoice_totals.count, 3);
    assert!((invoice_totals.total_sum - 42.40).abs() < 1e-9);

    let monthly = report.monthly_series.unwrap();
    assert!(monthly.iter().all(|m| !m.month.is_empty()));
    assert!(monthly[0].month >= monthly[monthly.len() - 1].month);

    let issuers = report.top_issuers.unwrap();
    assert_eq!(issuers[0].issuer_tax_id, "0999999999001");
    assert!((issuers[0].total_sum - 28.00).abs() < 1e-9);

    Ok(())
}

#[tokio::test]
async fn test_batch_survives_bad_files_and_reports_them() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    let aliases = AliasTable::builtin();

    let mut files = batch_files();
    files.insert(
        1,
        SourceFile {
            name: "roto.xml".to_string(),
            contents: b"<factura><infoTributaria>".to_vec(),
        },
    );
    files.push(SourceFile {
        name: "firma.p12".to_string(),
        contents: vec![0x30, 0x82],
    });

    let summary = ingest_batch(storage.clone(), &aliases, files).await;
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);

    let failed: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| o.error.is_some())
        .collect();
    assert_eq!(failed.len(), 2);
    assert_eq!(failed[0].file, "roto.xml");
    assert_eq!(failed[1].file, "firma.p12");

    // Good files still landed
    assert_eq!(storage.all_records().await?.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_self_closing_markup_ingests_as_default_invoice() -> Result<()> {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    let aliases = AliasTable::builtin();

    let files = vec![SourceFile {
        name: "vacia.xml".to_string(),
        contents: b"<factura/>".to_vec(),
    }];
    let summary = ingest_batch(storage.clone(), &aliases, files).await;
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert!(summary.outcomes[0].error.is_none());

    let records = storage.all_records().await?;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].document_type, DocumentType::Invoice);
    assert_eq!(records[0].document_number, "");
    assert_eq!(records[0].total, 0.0);
    Ok(())
}

#[tokio::test]
async fn test_ingest_from_disk_and_export() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let xml_path = dir.path().join("factura_123.xml");
    let txt_path = dir.path().join("lote.txt");
    std::fs::write(&xml_path, FACTURA_XML)?;
    std::fs::write(&txt_path, LOTE_TXT)?;

    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
    let aliases = AliasTable::builtin();
    let files = vec![
        SourceFile {
            name: "factura_123.xml".to_string(),
            contents: std::fs::read(&xml_path)?,
        },
        SourceFile {
            name: "lote.txt".to_string(),
            contents: std::fs::read(&txt_path)?,
        },
    ];

    let summary = ingest_batch(storage.clone(), &aliases, files).await;
    assert_eq!(summary.succeeded, 2);

    let records = storage.scan_records(&RecordQuery::default()).await?;
    assert_eq!(records.len(), 3);

    let sheet = export::spreadsheet_bytes(&records)?;
    let text = String::from_utf8(sheet)?;
    assert!(text.starts_with("tipo,numero,fecha"));
    assert_eq!(text.lines().count(), 4);

    let pdf = export::pdf_bytes(&records)?;
    assert!(pdf.starts_with(b"%PDF-"));
    Ok(())
}
