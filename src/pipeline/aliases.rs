use once_cell::sync::Lazy;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{IngestError, Result};

/// Canonical columns a tabular source can bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    DocumentType,
    DocumentNumber,
    IssueDate,
    IssuerTaxId,
    IssuerName,
    ReceiverTaxId,
    ReceiverName,
    Subtotal,
    Tax,
    Total,
}

impl Column {
    pub const ALL: [Column; 10] = [
        Column::DocumentType,
        Column::DocumentNumber,
        Column::IssueDate,
        Column::IssuerTaxId,
        Column::IssuerName,
        Column::ReceiverTaxId,
        Column::ReceiverName,
        Column::Subtotal,
        Column::Tax,
        Column::Total,
    ];

    fn config_key(&self) -> &'static str {
        match self {
            Column::DocumentType => "document_type",
            Column::DocumentNumber => "document_number",
            Column::IssueDate => "issue_date",
            Column::IssuerTaxId => "issuer_tax_id",
            Column::IssuerName => "issuer_name",
            Column::ReceiverTaxId => "receiver_tax_id",
            Column::ReceiverName => "receiver_name",
            Column::Subtotal => "subtotal",
            Column::Tax => "tax",
            Column::Total => "total",
        }
    }
}

#[derive(Debug, Deserialize)]
struct AliasConfig {
    aliases: HashMap<String, Vec<String>>,
}

/// Data-driven header alias table: canonical column -> accepted source
/// spellings in priority order. New spellings are added in configuration,
/// never in normalization logic.
#[derive(Debug, Clone)]
pub struct AliasTable {
    aliases: HashMap<Column, Vec<String>>,
}

static BUILTIN: Lazy<AliasTable> = Lazy::new(|| {
    AliasTable::from_toml(include_str!("../../config/header_aliases.toml"))
        .expect("built-in alias table is valid")
});

impl AliasTable {
    /// The alias table compiled into the binary, used when no external
    /// configuration is supplied.
    pub fn builtin() -> AliasTable {
        BUILTIN.clone()
    }

    pub fn load(path: &Path) -> Result<AliasTable> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<AliasTable> {
        let config: AliasConfig = toml::from_str(contents)?;
        let mut aliases = HashMap::new();
        for column in Column::ALL {
            let spellings = config
                .aliases
                .get(column.config_key())
                .ok_or_else(|| {
                    IngestError::Config(format!(
                        "alias table missing column {}",
                        column.config_key()
                    ))
                })?
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect();
            aliases.insert(column, spellings);
        }
        Ok(AliasTable { aliases })
    }

    /// Bind header names to canonical columns. For each canonical column the
    /// first alias (in priority order) that matches any header,
    /// case-insensitively, wins; columns with no matching header stay
    /// unbound and their fields take defaults.
    pub fn bind(&self, headers: &[&str]) -> HashMap<Column, usize> {
        let normalized: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let mut bindings = HashMap::new();
        for column in Column::ALL {
            let Some(spellings) = self.aliases.get(&column) else {
                continue;
            };
            for alias in spellings {
                if let Some(idx) = normalized.iter().position(|h| h == alias) {
                    bindings.insert(column, idx);
                    break;
                }
            }
        }
        bindings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issuer_tax_id_spellings_are_interchangeable() {
        let table = AliasTable::builtin();
        for header in ["RUC_EMISOR", "ruc_emisor", "RUC"] {
            let bindings = table.bind(&["Tipo", header, "Total"]);
            assert_eq!(bindings.get(&Column::IssuerTaxId), Some(&1), "header {header}");
        }
    }

    #[test]
    fn test_alias_priority_order() {
        let table = AliasTable::builtin();
        // ruc_emisor is listed before ruc, so it wins even when both appear
        let bindings = table.bind(&["ruc", "ruc_emisor"]);
        assert_eq!(bindings.get(&Column::IssuerTaxId), Some(&1));
    }

    #[test]
    fn test_spaced_header_binds_issuer_name() {
        let table = AliasTable::builtin();
        let bindings = table.bind(&["Tipo", "Numero", "RUC", "Razon Social", "Fecha", "Total"]);
        assert_eq!(bindings.get(&Column::IssuerName), Some(&3));
        assert_eq!(bindings.get(&Column::DocumentType), Some(&0));
        assert_eq!(bindings.get(&Column::Total), Some(&5));
        // No subtotal column in this header
        assert_eq!(bindings.get(&Column::Subtotal), None);
    }

    #[test]
    fn test_missing_column_in_config_is_an_error() {
        let result = AliasTable::from_toml("[aliases]\ndocument_type = [\"tipo\"]\n");
        assert!(matches!(result, Err(IngestError::Config(_))));
    }
}
