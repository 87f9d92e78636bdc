use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::domain::CanonicalRecord;
use crate::error::Result;
use crate::pipeline::aliases::AliasTable;
use crate::pipeline::detect::{detect, NormalizerKind};
use crate::pipeline::markup::{normalize_markup, parse_markup};
use crate::pipeline::tabular::{normalize_header_rows, normalize_position_lines};
use crate::storage::Storage;

/// One uploaded file, exactly as handed over by the transport.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub contents: Vec<u8>,
}

/// Tagged outcome of one file's normalization.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileOutcome {
    pub file: String,
    pub records: usize,
    pub error: Option<String>,
}

/// Per-batch summary: every file is accounted for, successes and failures
/// alike.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<FileOutcome>,
}

/// Normalize a file into zero or more canonical records.
///
/// Unsupported extensions and structurally unparsable input are errors;
/// missing or malformed individual fields never are.
pub fn normalize_file(file: &SourceFile, aliases: &AliasTable) -> Result<Vec<CanonicalRecord>> {
    let kind = detect(&file.name)?;
    let text = std::str::from_utf8(&file.contents)
        .map_err(|e| crate::error::IngestError::Parse(e.to_string()))?;

    match kind {
        NormalizerKind::Markup => {
            let tree = parse_markup(text)?;
            Ok(vec![normalize_markup(&tree, &file.name)])
        }
        NormalizerKind::HeaderTabular => normalize_header_rows(text, aliases, &file.name),
        NormalizerKind::PositionTabular => Ok(normalize_position_lines(text, &file.name)),
    }
}

/// Run a batch of files through the pipeline in submission order.
///
/// Files are isolated from one another: a failure is recorded in that
/// file's outcome and the batch moves on. Records from one file are fully
/// inserted before the next file begins; a storage failure aborts the
/// current file's remaining records only.
pub async fn ingest_batch(
    storage: Arc<dyn Storage>,
    aliases: &AliasTable,
    files: Vec<SourceFile>,
) -> BatchSummary {
    let mut outcomes = Vec::with_capacity(files.len());

    for file in files {
        let outcome = ingest_file(storage.clone(), aliases, &file).await;
        match &outcome.error {
            None => info!(file = %outcome.file, records = outcome.records, "file ingested"),
            Some(reason) => warn!(file = %outcome.file, reason = %reason, "file skipped"),
        }
        outcomes.push(outcome);
    }

    let failed = outcomes.iter().filter(|o| o.error.is_some()).count();
    BatchSummary {
        succeeded: outcomes.len() - failed,
        failed,
        outcomes,
    }
}

async fn ingest_file(
    storage: Arc<dyn Storage>,
    aliases: &AliasTable,
    file: &SourceFile,
) -> FileOutcome {
    let records = match normalize_file(file, aliases) {
        Ok(records) => records,
        Err(e) => {
            return FileOutcome {
                file: file.name.clone(),
                records: 0,
                error: Some(e.to_string()),
            }
        }
    };

    let mut inserted = 0;
    for mut record in records {
        if let Err(e) = storage.insert_record(&mut record).await {
            return FileOutcome {
                file: file.name.clone(),
                records: inserted,
                error: Some(e.to_string()),
            };
        }
        inserted += 1;
    }

    FileOutcome {
        file: file.name.clone(),
        records: inserted,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DocumentType;
    use crate::storage::InMemoryStorage;

    fn file(name: &str, contents: &str) -> SourceFile {
        SourceFile {
            name: name.to_string(),
            contents: contents.as_bytes().to_vec(),
        }
    }

    #[tokio::test]
    async fn test_batch_isolates_per_file_failures() {
        let storage = Arc::new(InMemoryStorage::new());
        let aliases = AliasTable::builtin();
        let files = vec![
            file("uno.txt", "factura|001|2024-01-05|0999|ACME|||11.20"),
            file("roto.xml", "<factura><sin_cerrar>"),
            file("otro.pdf", "%PDF-1.4"),
            file("dos.txt", "retencion|002|2024-01-06|0999|ACME|||3.00"),
        ];

        let summary = ingest_batch(storage.clone(), &aliases, files).await;

        assert_eq!(summary.succeeded, 2);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.outcomes.len(), 4);
        assert!(summary.outcomes[1].error.is_some());
        assert!(summary.outcomes[2]
            .error
            .as_deref()
            .unwrap()
            .contains("unsupported"));

        // Both good files landed despite the failures between them
        let all = storage.all_records().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_batch_preserves_submission_order() {
        let storage = Arc::new(InMemoryStorage::new());
        let aliases = AliasTable::builtin();
        let files = vec![
            file("b.csv", "tipo,numero,total\nfactura,001,1.00\nfactura,002,2.00\n"),
            file("a.txt", "notaCredito|003|2024-01-05|0999|ACME|||4.00"),
        ];

        let summary = ingest_batch(storage, &aliases, files).await;
        assert_eq!(summary.outcomes[0].file, "b.csv");
        assert_eq!(summary.outcomes[0].records, 2);
        assert_eq!(summary.outcomes[1].file, "a.txt");
        assert_eq!(summary.outcomes[1].records, 1);
    }

    #[test]
    fn test_normalize_file_routes_markup() {
        let aliases = AliasTable::builtin();
        let records = normalize_file(
            &file(
                "f.xml",
                "<factura><infoTributaria><ruc>0999</ruc></infoTributaria></factura>",
            ),
            &aliases,
        )
        .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].document_type, DocumentType::Invoice);
        assert_eq!(records[0].issuer_tax_id, "0999");
    }
}
