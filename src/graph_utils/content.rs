use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::graph::{LocalId, MindmapGraph, NodeType};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRecord {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaRecord {
    pub name: String,
    pub expression: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseRecord {
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub difficulty: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExampleRecord {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// One generated content item, tagged by its kind on the wire.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContentRecord {
    Concept(ConceptRecord),
    Formula(FormulaRecord),
    Exercise(ExerciseRecord),
    Example(ExampleRecord),
}

/// Which collection a generation request fills.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Concepts,
    Formulas,
    Exercises,
}

impl ContentKind {
    pub fn for_node_type(t: NodeType) -> Self {
        match t {
            NodeType::Concept => ContentKind::Concepts,
            NodeType::Formula => ContentKind::Formulas,
            NodeType::Exercise | NodeType::Example => ContentKind::Exercises,
        }
    }

    pub fn path_segment(self) -> &'static str {
        match self {
            ContentKind::Concepts => "concepts",
            ContentKind::Formulas => "formulas",
            ContentKind::Exercises => "exercises",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct NodeContent {
    pub concepts: Vec<ConceptRecord>,
    pub formulas: Vec<FormulaRecord>,
    pub exercises: Vec<ExerciseRecord>,
    pub examples: Vec<ExampleRecord>,
}

impl NodeContent {
    pub fn len(&self) -> usize {
        self.concepts.len() + self.formulas.len() + self.exercises.len() + self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Generated content attached to nodes, kept apart from the graph itself.
#[derive(Clone, Debug, Default)]
pub struct ContentStore {
    by_node: HashMap<LocalId, NodeContent>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records to the node's collections. Returns how many were added.
    pub fn attach(&mut self, node: LocalId, records: impl IntoIterator<Item = ContentRecord>) -> usize {
        let entry = self.by_node.entry(node).or_default();
        let mut added = 0usize;
        for r in records {
            match r {
                ContentRecord::Concept(c) => entry.concepts.push(c),
                ContentRecord::Formula(f) => entry.formulas.push(f),
                ContentRecord::Exercise(e) => entry.exercises.push(e),
                ContentRecord::Example(e) => entry.examples.push(e),
            }
            added += 1;
        }
        added
    }

    pub fn get(&self, node: LocalId) -> Option<&NodeContent> {
        self.by_node.get(&node)
    }

    pub fn count(&self, node: LocalId) -> usize {
        self.by_node.get(&node).map(NodeContent::len).unwrap_or(0)
    }

    pub fn remove_all(&mut self, nodes: &[LocalId]) {
        for id in nodes {
            self.by_node.remove(id);
        }
    }

    /// Drop entries whose node no longer exists in `graph`.
    pub fn retain_nodes(&mut self, graph: &MindmapGraph) {
        self.by_node.retain(|id, _| graph.contains(*id));
    }
}
