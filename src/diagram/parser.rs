//! Authoritative validity check, backed by the `merman` Mermaid parser.
//!
//! The heuristic checker only advises; this module decides. [`DiagramParser`]
//! is the seam: [`MermaidParser`] runs merman's mermaid@11 grammars, and
//! callers hold it as `Arc<dyn DiagramParser>` so tests can substitute a
//! fixed verdict.

use merman::{Engine, ParseOptions};

use super::DiagramKind;
use super::check::declared_kind;

/// Summary of a successfully parsed definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDiagram {
    /// Grammar the parser detected, mapped onto the labels the UI shows.
    pub kind: DiagramKind,
    /// merman's diagram id (`flowchart-v2`, `sequence`, `er`, ...).
    pub diagram_type: String,
}

/// Why a definition was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("diagram definition is empty")]
    Empty,

    #[error("no diagram type detected; the first line must declare one (e.g. 'flowchart TD')")]
    UnknownType,

    #[error("{0}")]
    Rejected(String),
}

impl From<merman::Error> for ParseError {
    fn from(err: merman::Error) -> Self {
        match err {
            merman::Error::DetectType(_) => Self::UnknownType,
            other => Self::Rejected(other.to_string()),
        }
    }
}

/// Validates a diagram definition.
pub trait DiagramParser: Send + Sync {
    /// Parse `text`, returning a summary or the parser's error.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the definition is not valid Mermaid.
    fn parse(&self, text: &str) -> Result<ParsedDiagram, ParseError>;
}

/// Strict parse through a shared merman [`Engine`].
#[derive(Debug, Clone, Default)]
pub struct MermaidParser {
    engine: Engine,
}

impl MermaidParser {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagramParser for MermaidParser {
    fn parse(&self, text: &str) -> Result<ParsedDiagram, ParseError> {
        if text.trim().is_empty() {
            return Err(ParseError::Empty);
        }

        let parsed = self
            .engine
            .parse_diagram_sync(text, ParseOptions::strict())?
            .ok_or(ParseError::UnknownType)?;

        let diagram_type = parsed.meta.diagram_type;
        let kind = kind_for(&diagram_type, declared_kind(text));
        Ok(ParsedDiagram { kind, diagram_type })
    }
}

/// Map a merman diagram id to a [`DiagramKind`]. Every flowchart id covers
/// both `flowchart` and `graph`, so the declaration keyword breaks the tie.
fn kind_for(diagram_type: &str, declared: Option<DiagramKind>) -> DiagramKind {
    match diagram_type {
        "flowchart-v2" | "flowchart" | "flowchart-elk" => match declared {
            Some(DiagramKind::Graph) => DiagramKind::Graph,
            _ => DiagramKind::Flowchart,
        },
        "sequence" => DiagramKind::Sequence,
        "classDiagram" | "class" => DiagramKind::Class,
        "stateDiagram" | "state" => DiagramKind::State,
        "er" => DiagramKind::EntityRelationship,
        "gantt" => DiagramKind::Gantt,
        "journey" => DiagramKind::Journey,
        _ => DiagramKind::Generic,
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
