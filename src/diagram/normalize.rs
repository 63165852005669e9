//! Response normalization: trim whitespace and strip markdown code fences.

const FENCE: &str = "```";

/// Strip surrounding whitespace and a wrapping fenced-code block.
///
/// The opening fence may carry a language tag (```` ```mermaid ````). Either
/// fence may be missing (truncated output); whatever is present is removed.
/// Surrounding whitespace is blank lines before the first content line and
/// anything after the last; indentation on the first content line is kept,
/// so a fenced interior comes back byte-identical. Idempotent.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut body = trimmed;

    if body.starts_with(FENCE) {
        body = match body.split_once('\n') {
            Some((_, rest)) => rest,
            None => "",
        };
    }

    if let Some(rest) = body.strip_suffix(FENCE) {
        body = match rest.rfind('\n') {
            Some(idx) if rest[idx + 1..].trim().is_empty() => &rest[..idx],
            // Closing fence with no preceding newline: the body is the fence line itself.
            None if rest.trim().is_empty() => "",
            _ => body,
        };
    }

    let unwrapped = if body.len() == trimmed.len() { raw } else { body };
    strip_blank_edges(unwrapped).to_owned()
}

/// Drop leading blank lines and all trailing whitespace.
fn strip_blank_edges(text: &str) -> &str {
    let text = text.trim_end();
    let Some(first) = text.find(|c: char| !c.is_whitespace()) else {
        return "";
    };
    let line_start = text[..first].rfind('\n').map_or(0, |idx| idx + 1);
    &text[line_start..]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fence_with_language_tag() {
        let raw = "```mermaid\nflowchart TD\n  A-->B\n```";
        assert_eq!(normalize(raw), "flowchart TD\n  A-->B");
    }

    #[test]
    fn strips_fence_without_language_tag() {
        let raw = "```\nsequenceDiagram\n  A->>B: hi\n```";
        assert_eq!(normalize(raw), "sequenceDiagram\n  A->>B: hi");
    }

    #[test]
    fn trims_surrounding_whitespace_and_fences() {
        let raw = "\n\n  ```mermaid\ngraph LR\n  A --> B\n```  \n";
        assert_eq!(normalize(raw), "graph LR\n  A --> B");
    }

    #[test]
    fn interior_is_byte_identical() {
        let interior = "erDiagram\n    CUSTOMER ||--o{ ORDER : places\n\n    ORDER {\n      int id\n    }";
        let raw = format!("```mermaid\n{interior}\n```");
        assert_eq!(normalize(&raw), interior);
    }

    #[test]
    fn first_line_indentation_is_kept() {
        assert_eq!(normalize("```\n  A-->B\n```"), "  A-->B");

        let interior = "  flowchart TD\n    A-->B";
        let raw = format!("```mermaid\n\n{interior}\n\n```\n");
        assert_eq!(normalize(&raw), interior);
        assert_eq!(normalize(interior), interior);
    }

    #[test]
    fn clean_input_passes_through() {
        let clean = "flowchart TD\n  A-->B";
        assert_eq!(normalize(clean), clean);
    }

    #[test]
    fn idempotent() {
        let inputs = [
            "```mermaid\nflowchart TD\n  A-->B\n```",
            "  gantt\n  title Plan  ",
            "```\n```",
            "",
            "```mermaid\nclassDiagram",
            "```\n  A-->B\n```",
            "\n\n   \n  sequenceDiagram\n",
        ];
        for raw in inputs {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn missing_closing_fence_strips_opening_only() {
        assert_eq!(normalize("```mermaid\nclassDiagram\n  A <|-- B"), "classDiagram\n  A <|-- B");
    }

    #[test]
    fn missing_opening_fence_strips_closing_only() {
        assert_eq!(normalize("journey\n  title Day\n```"), "journey\n  title Day");
    }

    #[test]
    fn empty_fence_normalizes_to_empty() {
        assert_eq!(normalize("```\n```"), "");
        assert_eq!(normalize("```mermaid"), "");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn inline_backticks_are_kept() {
        let text = "flowchart TD\n  A[\"run `make`\"] --> B";
        assert_eq!(normalize(text), text);
    }
}
