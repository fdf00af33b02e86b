//! Heuristic cleanup of model-synthesized query expressions.
//!
//! The model is asked for a single-line pandas expression, but in practice
//! returns code fences, comment lines, bare member-access chains, and the
//! occasional reference to a value instead of a column. [`sanitize`] applies
//! a fixed sequence of textual rewrites to recover an executable expression,
//! and gates anything that looks unsafe behind a canned invalid marker.
//!
//! This is a substring heuristic, not a parser. The structural restriction
//! lives downstream: sanitized text is parsed into a closed query grammar
//! (see [`crate::query`]) and never executed as code.

use std::fmt;

use crate::dataset::Dataset;

/// The identifier the dataset is bound to in synthesized expressions.
pub const DATASET_BINDING: &str = "df";

/// A sanitized query expression, ready for parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanitizedExpression {
    /// Cleaned expression text. Guaranteed non-empty and free of `import`
    /// and double-underscore substrings, by construction.
    Code(String),
    /// The expression was empty or tripped the safety gate. Evaluates to the
    /// fixed invalid-code error.
    Invalid,
}

impl SanitizedExpression {
    pub fn as_code(&self) -> Option<&str> {
        match self {
            SanitizedExpression::Code(code) => Some(code),
            SanitizedExpression::Invalid => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, SanitizedExpression::Invalid)
    }
}

impl fmt::Display for SanitizedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanitizedExpression::Code(code) => write!(f, "{}", code),
            SanitizedExpression::Invalid => {
                write!(f, "raise ValueError('Invalid or unsafe code generated.')")
            }
        }
    }
}

/// Sanitize raw model output into an executable expression.
///
/// Applied in order:
/// 1. Strip markdown code-fence markers.
/// 2. Drop blank lines and `#`-comment lines.
/// 3. Prefix the dataset binding if the text starts with a member-access dot.
/// 4. If no `['<column>']` reference matches a real column but the text has a
///    `.groupby(` call or any bracket indexing, rewrite to a row count of
///    rows whose `Category` column equals the value found in the last
///    bracket pair. (The hardcoded `Category` column is preserved behavior;
///    it assumes the expected sample schema.)
/// 5. Safety gate: empty text, `import`, or `__` yields
///    [`SanitizedExpression::Invalid`].
pub fn sanitize(raw: &str, dataset: &Dataset) -> SanitizedExpression {
    let unfenced = raw.replace("```python", "").replace("```", "");
    let mut code = unfenced
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string();

    if code.starts_with('.') {
        code = format!("{}{}", DATASET_BINDING, code);
    }

    let references_real_column = dataset
        .columns()
        .iter()
        .any(|col| code.contains(&format!("['{}']", col)));

    if !references_real_column && (code.contains(".groupby(") || code.contains('[')) {
        let possible_value = extract_last_bracket_value(&code);
        code = format!(
            "{df}[{df}['Category'] == '{value}'].shape[0]",
            df = DATASET_BINDING,
            value = possible_value,
        );
    }

    if code.is_empty() || code.contains("import") || code.contains("__") {
        return SanitizedExpression::Invalid;
    }

    SanitizedExpression::Code(code)
}

/// The substring after the last `[` and before the following `]`, with
/// surrounding quote characters stripped. With no brackets present this is
/// the whole text, quote-stripped.
fn extract_last_bracket_value(code: &str) -> String {
    let after_bracket = code.rsplit('[').next().unwrap_or(code);
    let inside = after_bracket.split(']').next().unwrap_or(after_bracket);
    inside.trim_matches(['\'', '"']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{CellValue, Dataset};
    use pretty_assertions::assert_eq;

    fn dataset_with_columns(names: &[&str]) -> Dataset {
        let columns: Vec<String> = names.iter().map(|s| s.to_string()).collect();
        let row = vec![CellValue::Empty; columns.len()];
        Dataset::from_rows(columns, vec![row]).unwrap()
    }

    // ── fence and comment stripping ─────────────────────────────────

    #[test]
    fn test_strips_python_code_fences() {
        let ds = dataset_with_columns(&["Category"]);
        let raw = "```python\ndf[df['Category'] == 'Electronics'].shape[0]\n```";
        let result = sanitize(raw, &ds);
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'Electronics'].shape[0]")
        );
    }

    #[test]
    fn test_drops_comment_and_blank_lines() {
        let ds = dataset_with_columns(&["Category"]);
        let raw = "# count matching rows\n\ndf[df['Category'] == 'Books'].shape[0]\n\n";
        let result = sanitize(raw, &ds);
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'Books'].shape[0]")
        );
    }

    #[test]
    fn test_fences_comments_and_trailing_blank_together() {
        // End-to-end scenario 2: fence + leading comment + trailing blank line.
        let ds = dataset_with_columns(&["Category"]);
        let raw = "```python\n# filter by category\ndf[df['Category'] == 'Toys']\n\n```";
        let result = sanitize(raw, &ds);
        assert_eq!(result.as_code(), Some("df[df['Category'] == 'Toys']"));
    }

    // ── leading-dot prefixing ───────────────────────────────────────

    #[test]
    fn test_prefixes_dataset_binding_for_leading_dot() {
        let ds = dataset_with_columns(&["Category"]);
        let result = sanitize(".shape[0]", &ds);
        assert_eq!(result.as_code(), Some("df.shape[0]"));
    }

    // ── column-reference fallback ───────────────────────────────────

    #[test]
    fn test_real_column_reference_passes_through() {
        let ds = dataset_with_columns(&["Category", "Price"]);
        let raw = "df[df['Category'] == 'Electronics'].shape[0]";
        assert_eq!(sanitize(raw, &ds).as_code(), Some(raw));
    }

    #[test]
    fn test_unknown_column_triggers_category_fallback() {
        let ds = dataset_with_columns(&["Category", "Price"]);
        let raw = "df[df['Type'] == 'Electronics']";
        let result = sanitize(raw, &ds);
        // The last bracket pair opened is ['Type'] (the filter's inner
        // indexing), so that is the value the rewrite picks up.
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'Type'].shape[0]")
        );
    }

    #[test]
    fn test_fallback_extracts_last_bracket_pair() {
        let ds = dataset_with_columns(&["Category"]);
        // 'Sales' is not a real column; the last bracket pair holds it.
        let raw = "df.groupby('Region')['Sales']";
        let result = sanitize(raw, &ds);
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'Sales'].shape[0]")
        );
    }

    #[test]
    fn test_fallback_strips_double_quotes() {
        let ds = dataset_with_columns(&["Category"]);
        let raw = r#"df[df["Type"] == "Books"]"#;
        let result = sanitize(raw, &ds);
        // The last bracket pair is ["Type"]; the quotes are stripped.
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'Type'].shape[0]")
        );
    }

    #[test]
    fn test_groupby_without_brackets_uses_whole_text() {
        // End-to-end scenario 4 shape: a groupby call with no bracket
        // indexing at all. The extraction sees no bracket pair and takes the
        // whole text, mirroring the reference behavior.
        let ds = dataset_with_columns(&["Category"]);
        let result = sanitize(".groupby('Category').size()", &ds);
        assert_eq!(
            result.as_code(),
            Some("df[df['Category'] == 'df.groupby('Category').size()'].shape[0]")
        );
    }

    #[test]
    fn test_no_brackets_no_groupby_passes_through() {
        let ds = dataset_with_columns(&["Category"]);
        let result = sanitize("df.shape", &ds);
        assert_eq!(result.as_code(), Some("df.shape"));
    }

    // ── safety gate ─────────────────────────────────────────────────

    #[test]
    fn test_empty_input_is_invalid() {
        let ds = dataset_with_columns(&["Category"]);
        assert!(sanitize("", &ds).is_invalid());
        assert!(sanitize("   \n# only a comment\n", &ds).is_invalid());
    }

    #[test]
    fn test_import_is_invalid() {
        let ds = dataset_with_columns(&["Category"]);
        assert!(sanitize("import os", &ds).is_invalid());
    }

    #[test]
    fn test_dunder_is_invalid() {
        // End-to-end scenario 3.
        let ds = dataset_with_columns(&["Category"]);
        let result = sanitize("__import__('os').system('rm -rf /')", &ds);
        assert!(result.is_invalid());
        assert_eq!(
            result.to_string(),
            "raise ValueError('Invalid or unsafe code generated.')"
        );
    }

    #[test]
    fn test_code_variant_displays_text() {
        let expr = SanitizedExpression::Code("df.shape[0]".to_string());
        assert_eq!(expr.to_string(), "df.shape[0]");
    }
}
