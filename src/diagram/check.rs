//! Heuristic syntax checks plus the authoritative parse.
//!
//! Heuristics run line by line and only ever produce warnings:
//! a missing type declaration, unbalanced brackets on a line, and node
//! identifiers with characters Mermaid will not accept unquoted. The parser
//! result alone decides `is_valid`.

use super::parser::{DiagramParser, ParsedDiagram};
use super::{DiagramKind, ValidationResult, classify};

const BRACKETS: [(char, char); 3] = [('[', ']'), ('(', ')'), ('{', '}')];

const FLOW_CONNECTORS: [&str; 6] = ["-.->", "-->", "---", "==>", "-.-", "~~~"];
const SEQUENCE_CONNECTORS: [&str; 8] = ["-->>", "->>", "--x", "--)", "-->", "-x", "-)", "->"];
const STATE_CONNECTORS: [&str; 1] = ["-->"];

/// Validate `text`: heuristic warnings, then the parser's verdict.
#[must_use]
pub fn validate(text: &str, parser: &dyn DiagramParser) -> ValidationResult {
    inspect(text, parser).0
}

/// Like [`validate`], also returning the parser's summary when it accepted
/// the text.
#[must_use]
pub fn inspect(text: &str, parser: &dyn DiagramParser) -> (ValidationResult, Option<ParsedDiagram>) {
    let warnings = heuristic_warnings(text);

    match parser.parse(text) {
        Ok(parsed) => (ValidationResult { is_valid: true, errors: Vec::new(), warnings }, Some(parsed)),
        Err(err) => (ValidationResult { is_valid: false, errors: vec![err.to_string()], warnings }, None),
    }
}

/// All advisory warnings for `text`, in line order.
#[must_use]
pub fn heuristic_warnings(text: &str) -> Vec<String> {
    let lines = significant_lines(text);
    let Some(first) = lines.first() else {
        return vec!["Definition has no diagram type declaration".to_owned()];
    };

    let mut warnings = Vec::new();
    let header = header_kind(first.text);
    if header.is_none() {
        warnings.push(format!(
            "Line {}: missing diagram type declaration (expected e.g. 'flowchart TD' or 'sequenceDiagram')",
            first.number
        ));
    }
    let kind = header.unwrap_or_else(|| classify(text));

    // The declaration line itself is not checked further.
    let body = if header.is_some() { &lines[1..] } else { &lines[..] };
    for &line in body {
        check_brackets(kind, line, &mut warnings);
        check_identifiers(kind, line, &mut warnings);
    }
    warnings
}

// =============================================================================
// DECLARATION
// =============================================================================

/// A significant source line.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    number: usize,
    text: &'a str,
}

/// Kind named by the declaration keyword on the first significant line.
#[must_use]
pub fn declared_kind(text: &str) -> Option<DiagramKind> {
    significant_lines(text).first().and_then(|line| header_kind(line.text))
}

/// Map the leading keyword of `line` to its grammar. Matching is exact,
/// like Mermaid's detectors.
fn header_kind(line: &str) -> Option<DiagramKind> {
    let keyword = line.split(|c: char| c.is_whitespace() || c == ';').next().unwrap_or_default();
    match keyword {
        "flowchart" | "flowchart-elk" => Some(DiagramKind::Flowchart),
        "graph" => Some(DiagramKind::Graph),
        "sequenceDiagram" => Some(DiagramKind::Sequence),
        "classDiagram" | "classDiagram-v2" => Some(DiagramKind::Class),
        "stateDiagram" | "stateDiagram-v2" => Some(DiagramKind::State),
        "erDiagram" => Some(DiagramKind::EntityRelationship),
        "gantt" => Some(DiagramKind::Gantt),
        "journey" => Some(DiagramKind::Journey),
        _ => None,
    }
}

/// Trimmed non-empty lines with their 1-based numbers, dropping `%%`
/// comments, `%%{init}%%` directives and a leading `---` front-matter block.
/// Unclosed front matter leaves nothing.
fn significant_lines(text: &str) -> Vec<Line<'_>> {
    let mut out = Vec::new();
    let mut in_front_matter = false;
    let mut seen_content = false;

    for (idx, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();

        if in_front_matter {
            if trimmed == "---" {
                in_front_matter = false;
            }
            continue;
        }
        if trimmed.is_empty() || trimmed.starts_with("%%") {
            continue;
        }
        if !seen_content && trimmed == "---" {
            in_front_matter = true;
            seen_content = true;
            continue;
        }
        seen_content = true;
        out.push(Line { number: idx + 1, text: trimmed });
    }

    if in_front_matter { Vec::new() } else { out }
}

// =============================================================================
// BRACKETS
// =============================================================================

fn check_brackets(kind: DiagramKind, line: Line<'_>, warnings: &mut Vec<String>) {
    let mut text = strip_quoted(line.text);

    match kind {
        DiagramKind::Class | DiagramKind::State | DiagramKind::EntityRelationship => {
            if text == "}" {
                return;
            }
            if let Some(open) = text.strip_suffix('{') {
                text = open.to_owned();
            }
            if kind == DiagramKind::EntityRelationship {
                // Cardinality tokens like `||--o{` carry braces.
                text = text
                    .split_whitespace()
                    .filter(|token| !(token.contains("--") || token.contains("..")))
                    .collect::<Vec<_>>()
                    .join(" ");
            }
        }
        DiagramKind::Sequence => {
            text = text.replace("--)", " ").replace("-)", " ");
        }
        _ => {}
    }

    for (open, close) in BRACKETS {
        let mut opened = text.chars().filter(|&c| c == open).count();
        let closed = text.chars().filter(|&c| c == close).count();

        // Asymmetric flowchart shape `id>label]` closes with `]`.
        if open == '[' && matches!(kind, DiagramKind::Flowchart | DiagramKind::Graph | DiagramKind::Generic) {
            opened += asymmetric_shape_count(&text);
        }

        if opened != closed {
            warnings.push(format!(
                "Line {}: unbalanced brackets: {opened} '{open}' vs {closed} '{close}'",
                line.number
            ));
        }
    }
}

/// Count `>` directly following an identifier character (`A>text]`).
fn asymmetric_shape_count(text: &str) -> usize {
    text.as_bytes()
        .windows(2)
        .filter(|pair| pair[1] == b'>' && (pair[0].is_ascii_alphanumeric() || pair[0] == b'_'))
        .count()
}

// =============================================================================
// IDENTIFIERS
// =============================================================================

fn check_identifiers(kind: DiagramKind, line: Line<'_>, warnings: &mut Vec<String>) {
    let connectors: &[&str] = match kind {
        DiagramKind::Flowchart | DiagramKind::Graph | DiagramKind::Generic => &FLOW_CONNECTORS,
        DiagramKind::Sequence => &SEQUENCE_CONNECTORS,
        DiagramKind::State => &STATE_CONNECTORS,
        _ => return,
    };

    let mut text = strip_pipe_labels(&strip_quoted(line.text));
    if matches!(kind, DiagramKind::Sequence | DiagramKind::State) {
        // Message and transition text follows the colon.
        if let Some((arrows, _)) = text.split_once(':') {
            text = arrows.to_owned();
        }
    }

    let mut sides = Vec::new();
    let mut rest = text.as_str();
    while let Some((idx, len)) = find_connector(rest, connectors) {
        sides.push(&rest[..idx]);
        rest = rest[idx + len..].trim_start_matches(['-', '.', '=', '>']);
    }
    if sides.is_empty() {
        return;
    }
    sides.push(rest);

    for side in sides {
        // `A & B --> C`: every member of a node group is checked.
        for member in side.split('&') {
            let id = leading_identifier(kind, member);
            if !id.is_empty() && !id.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
                warnings.push(format!(
                    "Line {}: identifier '{id}' contains characters other than letters, digits, '_' or '-'",
                    line.number
                ));
            }
        }
    }
}

/// Earliest connector in `text`; the longest wins at equal positions.
fn find_connector(text: &str, connectors: &[&str]) -> Option<(usize, usize)> {
    connectors
        .iter()
        .filter_map(|c| text.find(c).map(|idx| (idx, c.len())))
        .min_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)))
}

fn leading_identifier(kind: DiagramKind, side: &str) -> &str {
    let mut side = side.trim();
    if kind == DiagramKind::Sequence {
        side = side.trim_start_matches(['+', '-']);
    }
    if kind == DiagramKind::State && side.starts_with("[*]") {
        return "";
    }
    let end = side
        .find(|c: char| c.is_whitespace() || "[({>:;".contains(c))
        .unwrap_or(side.len());
    &side[..end]
}

// =============================================================================
// TEXT HELPERS
// =============================================================================

/// Drop double-quoted spans (quotes included). An unterminated quote drops
/// the rest of the line.
fn strip_quoted(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_quotes = false;
    for ch in text.chars() {
        if ch == '"' {
            in_quotes = !in_quotes;
        } else if !in_quotes {
            out.push(ch);
        }
    }
    out
}

/// Drop `|edge label|` spans.
fn strip_pipe_labels(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_label = false;
    for ch in text.chars() {
        if ch == '|' {
            in_label = !in_label;
        } else if !in_label {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
