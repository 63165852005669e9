//! Keyword-based diagram type classification.
//!
//! Case-insensitive substring search over the grammar keywords, first match
//! in [`DiagramKind::RECOGNIZED`] order wins. Text that mentions a keyword
//! inside unrelated content is misclassified; the parser's detected type
//! ([`super::parser::ParsedDiagram::kind`]) is the exact alternative.

use super::DiagramKind;

/// Label the grammar `text` appears to be written in.
#[must_use]
pub fn classify(text: &str) -> DiagramKind {
    let lower = text.to_lowercase();
    DiagramKind::RECOGNIZED
        .into_iter()
        .find(|kind| {
            kind.keyword()
                .is_some_and(|kw| lower.contains(&kw.to_lowercase()))
        })
        .unwrap_or(DiagramKind::Generic)
}
