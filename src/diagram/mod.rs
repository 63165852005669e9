//! Diagram pipeline — prompt, normalize, classify, check.
//!
//! DESIGN
//! ======
//! Pure functions over strings. The only I/O in the generation flow is the
//! completion call in `services::generate`; everything here is deterministic
//! and can be re-run whenever the definition changes.
//!
//! Validation is two-tier: `check` produces advisory heuristic warnings, and
//! the merman-backed `parser` decides validity. Heuristics never mark a definition
//! invalid on their own.

pub mod check;
pub mod classify;
pub mod normalize;
pub mod parser;
pub mod prompt;

use serde::Serialize;

pub use check::validate;
pub use classify::classify;
pub use normalize::normalize;
pub use prompt::compose_prompt;

// =============================================================================
// DIAGRAM KIND
// =============================================================================

/// The diagram grammar a definition is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagramKind {
    EntityRelationship,
    Sequence,
    Class,
    Flowchart,
    Gantt,
    State,
    Journey,
    Graph,
    /// Fallback when no grammar keyword was recognized.
    Generic,
}

impl DiagramKind {
    /// Recognized kinds in keyword-match priority order.
    pub const RECOGNIZED: [Self; 8] = [
        Self::EntityRelationship,
        Self::Sequence,
        Self::Class,
        Self::Flowchart,
        Self::Gantt,
        Self::State,
        Self::Journey,
        Self::Graph,
    ];

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::EntityRelationship => "Entity Relationship Diagram",
            Self::Sequence => "Sequence Diagram",
            Self::Class => "Class Diagram",
            Self::Flowchart => "Flowchart",
            Self::Gantt => "Gantt Chart",
            Self::State => "State Diagram",
            Self::Journey => "User Journey",
            Self::Graph => "Graph",
            Self::Generic => "Diagram",
        }
    }

    /// The grammar's declaration keyword, if any.
    #[must_use]
    pub const fn keyword(self) -> Option<&'static str> {
        match self {
            Self::EntityRelationship => Some("erDiagram"),
            Self::Sequence => Some("sequenceDiagram"),
            Self::Class => Some("classDiagram"),
            Self::Flowchart => Some("flowchart"),
            Self::Gantt => Some("gantt"),
            Self::State => Some("stateDiagram"),
            Self::Journey => Some("journey"),
            Self::Graph => Some("graph"),
            Self::Generic => None,
        }
    }

    /// File name offered for downloads of this kind.
    #[must_use]
    pub const fn download_filename(self) -> &'static str {
        match self {
            Self::Flowchart => "flowchart.mmd",
            _ => "diagram.mmd",
        }
    }
}

impl std::fmt::Display for DiagramKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for DiagramKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

// =============================================================================
// VALIDATION RESULT
// =============================================================================

/// Outcome of checking a definition. Recomputed on every change.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

// =============================================================================
// ERRORS
// =============================================================================

/// The description was blank after trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("description is empty")]
pub struct EmptyInput;
