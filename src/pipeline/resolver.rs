use serde_json::Value;

/// Walk `path` into a parsed tree, returning the leaf value if every step
/// is present.
///
/// The markup's repeatable-element encoding wraps some nodes in
/// single-element arrays; each step (and the leaf) transparently unwraps
/// the first element of an array wrapper, so extraction paths never need
/// to know whether an element happened to repeat.
pub fn resolve<'a>(tree: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut node = tree;
    for key in path {
        if let Value::Array(items) = node {
            node = items.first()?;
        }
        node = node.get(key)?;
    }
    if let Value::Array(items) = node {
        node = items.first()?;
    }
    Some(node)
}

/// String lookup with the tolerant-extraction default of `""`.
pub fn string_at(tree: &Value, path: &[&str]) -> String {
    match resolve(tree, path) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Numeric lookup with the tolerant-extraction default of `0.0`.
pub fn number_at(tree: &Value, path: &[&str]) -> f64 {
    resolve(tree, path).map(parse_amount).unwrap_or(0.0)
}

/// Tolerant numeric parser: JSON numbers pass through, numeric strings are
/// parsed, anything else is 0.0. Never yields NaN.
pub fn parse_amount(value: &Value) -> f64 {
    match value {
        Value::Number(n) => {
            let parsed = n.as_f64().unwrap_or(0.0);
            if parsed.is_finite() {
                parsed
            } else {
                0.0
            }
        }
        Value::String(s) => parse_amount_str(s),
        _ => 0.0,
    }
}

/// String flavor of [`parse_amount`]; comma decimal separators tolerated.
pub fn parse_amount_str(raw: &str) -> f64 {
    let parsed = raw.trim().replace(',', ".").parse::<f64>().unwrap_or(0.0);
    if parsed.is_finite() {
        parsed
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolve_nested_path() {
        let tree = json!({"a": {"b": {"c": "hit"}}});
        assert_eq!(resolve(&tree, &["a", "b", "c"]), Some(&json!("hit")));
    }

    #[test]
    fn test_resolve_unwraps_single_element_arrays() {
        let tree = json!({"a": [{"b": [{"c": "hit"}]}]});
        assert_eq!(string_at(&tree, &["a", "b", "c"]), "hit");
    }

    #[test]
    fn test_resolve_missing_step_is_none() {
        let tree = json!({"a": {"b": 1}});
        assert_eq!(resolve(&tree, &["a", "x", "c"]), None);
        assert_eq!(string_at(&tree, &["a", "x"]), "");
        assert_eq!(number_at(&tree, &["a", "x"]), 0.0);
    }

    #[test]
    fn test_parse_amount_tolerates_bad_input() {
        assert_eq!(parse_amount(&json!("11.20")), 11.20);
        assert_eq!(parse_amount(&json!("11,20")), 11.20);
        assert_eq!(parse_amount(&json!(3.5)), 3.5);
        assert_eq!(parse_amount(&json!("not a number")), 0.0);
        assert_eq!(parse_amount(&json!(null)), 0.0);
        assert_eq!(parse_amount(&json!({"nested": true})), 0.0);
    }

    #[test]
    fn test_number_at_defaults_to_zero_not_nan() {
        let tree = json!({"amounts": {"total": "garbage"}});
        let value = number_at(&tree, &["amounts", "total"]);
        assert_eq!(value, 0.0);
        assert!(!value.is_nan());
    }
}
