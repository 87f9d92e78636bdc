use std::path::Path;

use crate::error::{IngestError, Result};

/// Which normalizer a file is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizerKind {
    /// Hierarchical markup document (`.xml`)
    Markup,
    /// Comma-delimited tabular text with a header row (`.csv`)
    HeaderTabular,
    /// Pipe-delimited tabular text, fixed field order, no header (`.txt`)
    PositionTabular,
}

/// Pure dispatch on the file extension. Unrecognized extensions are
/// rejected so the batch driver can skip the file without aborting.
pub fn detect(filename: &str) -> Result<NormalizerKind> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xml" => Ok(NormalizerKind::Markup),
        "csv" => Ok(NormalizerKind::HeaderTabular),
        "txt" => Ok(NormalizerKind::PositionTabular),
        _ => Err(IngestError::UnsupportedFormat(filename.to_string())),
    }
}
