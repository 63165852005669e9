//! Presentation helpers: the diagram container fragment and downloads.
//!
//! The browser-side renderer picks up `<pre class="mermaid">` blocks, so the
//! fragment only has to carry the escaped definition. A definition the parser
//! rejected gets a placeholder instead; the error itself stays in the
//! session's validation result.

use crate::diagram::{DiagramKind, ValidationResult};

/// MIME type for copied and downloaded definitions.
pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=utf-8";

/// HTML fragment for the diagram container.
#[must_use]
pub fn render_fragment(definition: &str, validation: &ValidationResult) -> String {
    if definition.is_empty() {
        return r#"<div class="diagram-empty">No diagram yet.</div>"#.to_owned();
    }
    if !validation.is_valid {
        return invalid_placeholder(validation);
    }
    format!(r#"<pre class="mermaid">{}</pre>"#, escape_html(definition))
}

fn invalid_placeholder(validation: &ValidationResult) -> String {
    let mut html = String::from(r#"<div class="diagram-invalid" role="alert"><strong>Invalid syntax</strong>"#);
    if let Some(first) = validation.errors.first() {
        html.push_str("<p>");
        html.push_str(&escape_html(first));
        html.push_str("</p>");
    }
    html.push_str("</div>");
    html
}

/// A file offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub filename: &'static str,
    pub body: String,
}

/// The definition as a `.mmd` file, or `None` when there is nothing to save.
#[must_use]
pub fn download(definition: &str, kind: DiagramKind) -> Option<Download> {
    if definition.is_empty() {
        return None;
    }
    Some(Download { filename: kind.download_filename(), body: definition.to_owned() })
}

/// `Content-Disposition` value for `filename`.
#[must_use]
pub fn attachment_header(filename: &str) -> String {
    format!("attachment; filename=\"{filename}\"")
}

/// Escape text for inclusion in HTML element content.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ValidationResult {
        ValidationResult { is_valid: true, errors: vec![], warnings: vec![] }
    }

    #[test]
    fn valid_definition_renders_escaped_pre() {
        let html = render_fragment("flowchart TD\n  A-->B[\"x & y\"]", &valid());
        assert_eq!(html, "<pre class=\"mermaid\">flowchart TD\n  A--&gt;B[&quot;x &amp; y&quot;]</pre>");
    }

    #[test]
    fn invalid_definition_renders_placeholder() {
        let validation =
            ValidationResult { is_valid: false, errors: vec!["line 2: <bad>".into()], warnings: vec![] };
        let html = render_fragment("flowchart TD\n  A -->", &validation);
        assert!(html.contains("Invalid syntax"));
        assert!(html.contains("line 2: &lt;bad&gt;"));
        assert!(!html.contains("class=\"mermaid\""));
    }

    #[test]
    fn warnings_do_not_block_rendering() {
        let validation = ValidationResult { is_valid: true, errors: vec![], warnings: vec!["w".into()] };
        assert!(render_fragment("flowchart TD", &validation).starts_with("<pre class=\"mermaid\">"));
    }

    #[test]
    fn empty_definition_renders_empty_state() {
        assert!(render_fragment("", &valid()).contains("diagram-empty"));
    }

    #[test]
    fn download_is_byte_identical() {
        let definition = "flowchart TD\n A-->B";
        let file = download(definition, DiagramKind::Flowchart).unwrap();
        assert_eq!(file.body.as_bytes(), definition.as_bytes());
        assert_eq!(file.filename, "flowchart.mmd");
    }

    #[test]
    fn download_non_flowchart_is_generic_name() {
        assert_eq!(download("journey", DiagramKind::Journey).unwrap().filename, "diagram.mmd");
    }

    #[test]
    fn download_of_empty_definition_is_noop() {
        assert_eq!(download("", DiagramKind::Generic), None);
    }

    #[test]
    fn attachment_header_quotes_filename() {
        assert_eq!(attachment_header("diagram.mmd"), "attachment; filename=\"diagram.mmd\"");
    }
}
