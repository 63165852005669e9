//! Prompt composition for diagram generation.

use std::fmt::Write;

use super::{DiagramKind, EmptyInput};

/// System instruction sent alongside the composed prompt.
pub const SYSTEM_PROMPT: &str = "You are a Mermaid diagram generator. You translate plain-language \
descriptions into a single valid Mermaid diagram definition and reply with nothing but that definition.";

/// Decision rule mapping description cues to a grammar, in the order shown to the model.
const DECISION_RULES: [(DiagramKind, &str); 8] = [
    (DiagramKind::Flowchart, "a process, workflow, algorithm, decision logic, or step-by-step procedure"),
    (DiagramKind::Sequence, "interactions or messages exchanged between actors, services, or systems over time"),
    (DiagramKind::Class, "object-oriented structure: classes, attributes, methods, inheritance"),
    (DiagramKind::EntityRelationship, "a data model, database schema, tables, or entities and their relationships"),
    (DiagramKind::State, "states of a single thing and the transitions between them (lifecycle, status machine)"),
    (DiagramKind::Gantt, "a schedule, project plan, timeline of tasks with dates or durations"),
    (DiagramKind::Journey, "a user experience across stages, with satisfaction scores per step"),
    (DiagramKind::Graph, "a general network of connected items with no clear flow or sequence"),
];

/// One worked example per grammar family, anchoring the output format.
const EXAMPLES: [(DiagramKind, &str); 8] = [
    (
        DiagramKind::Flowchart,
        "flowchart TD\n    A[Start] --> B{Is input valid?}\n    B -->|Yes| C[Process request]\n    B -->|No| D[Show error]\n    C --> E[End]\n    D --> E",
    ),
    (
        DiagramKind::Sequence,
        "sequenceDiagram\n    participant U as User\n    participant S as Server\n    U->>S: Submit form\n    S-->>U: Confirmation",
    ),
    (
        DiagramKind::Class,
        "classDiagram\n    class Animal {\n      +String name\n      +speak() void\n    }\n    Animal <|-- Dog",
    ),
    (
        DiagramKind::EntityRelationship,
        "erDiagram\n    CUSTOMER ||--o{ ORDER : places\n    ORDER {\n      int id PK\n      date created_at\n    }",
    ),
    (
        DiagramKind::State,
        "stateDiagram-v2\n    [*] --> Draft\n    Draft --> Review : submit\n    Review --> Published : approve\n    Published --> [*]",
    ),
    (
        DiagramKind::Gantt,
        "gantt\n    title Release plan\n    dateFormat YYYY-MM-DD\n    section Build\n    Design :a1, 2024-01-01, 7d\n    Implement :after a1, 14d",
    ),
    (
        DiagramKind::Journey,
        "journey\n    title Checkout\n    section Browse\n      Find product: 5: Customer\n    section Pay\n      Enter card: 2: Customer",
    ),
    (DiagramKind::Graph, "graph LR\n    Hub --- Alpha\n    Hub --- Beta\n    Alpha --- Beta"),
];

/// Build the generation prompt for `description`.
///
/// # Errors
///
/// Returns [`EmptyInput`] if the description is blank after trimming.
pub fn compose_prompt(description: &str) -> Result<String, EmptyInput> {
    if description.trim().is_empty() {
        return Err(EmptyInput);
    }

    let mut prompt = String::from(
        "Create a Mermaid diagram for the following description.\n\n<description>\n",
    );
    prompt.push_str(description);
    prompt.push_str("\n</description>\n\nChoose the diagram type that best fits the description:\n");

    for (kind, cue) in DECISION_RULES {
        let keyword = kind.keyword().unwrap_or_default();
        let _ = writeln!(prompt, "- {cue} -> `{keyword}` ({})", kind.label());
    }

    prompt.push_str(
        "\nRequirements:\n\
         - Return ONLY the Mermaid diagram code. No prose, no explanation.\n\
         - Do NOT wrap the code in markdown fences.\n\
         - The first line must be the diagram type declaration.\n\
         - Node identifiers use only letters, digits, underscores, or hyphens; put any other text in labels.\n\
         - Every opened bracket, brace, or parenthesis must be closed on the same line.\n\
         \nExamples:\n",
    );

    for (kind, example) in EXAMPLES {
        let _ = write!(prompt, "\n{}:\n{example}\n", kind.label());
    }

    Ok(prompt)
}
