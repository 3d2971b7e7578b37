//! Workflow graphs
//!
//! A workflow graph is a set of named LLM-invocation nodes plus directed
//! edges expressing execution order, branching and parallel fan-out/fan-in.
//! Structural invariants (acyclicity, reachability from a single entry node,
//! a complexity ceiling on edge count) are enforced by [`WorkflowGraph::validate`]
//! before a graph is ever handed to scoring.

use crate::error::ModelError;
use petgraph::algo::{is_cyclic_directed, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One LLM invocation inside a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowNode {
    /// Node name, unique within the graph
    pub name: String,
    /// Model identifier (provider-specific, opaque to the engine)
    pub model: String,
    /// Instruction template sent to the model
    pub instruction: String,
    /// Sampling temperature
    pub temperature: f64,
    /// Name of the expected output schema
    pub output_schema: String,
}

impl WorkflowNode {
    /// Create a node with default sampling settings
    #[must_use]
    pub fn new(name: impl Into<String>, model: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            instruction: instruction.into(),
            temperature: 0.7,
            output_schema: "text".to_string(),
        }
    }

    /// With sampling temperature
    #[inline]
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// With output schema name
    #[inline]
    #[must_use]
    pub fn with_output_schema(mut self, schema: impl Into<String>) -> Self {
        self.output_schema = schema.into();
        self
    }
}

/// Directed graph of LLM invocations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowGraph {
    /// Designated entry node name
    pub entry: String,
    /// Nodes, unique by name
    pub nodes: Vec<WorkflowNode>,
    /// Directed edges as (from, to) node names
    pub edges: Vec<(String, String)>,
}

impl WorkflowGraph {
    /// Create a single-node graph rooted at `entry`
    #[must_use]
    pub fn single(entry: WorkflowNode) -> Self {
        Self {
            entry: entry.name.clone(),
            nodes: vec![entry],
            edges: Vec::new(),
        }
    }

    /// Builder-style node addition
    #[inline]
    #[must_use]
    pub fn with_node(mut self, node: WorkflowNode) -> Self {
        self.nodes.push(node);
        self
    }

    /// Builder-style edge addition
    #[inline]
    #[must_use]
    pub fn with_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push((from.into(), to.into()));
        self
    }

    /// Number of nodes
    #[inline]
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of edges
    #[inline]
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Look up a node by name
    #[must_use]
    pub fn node(&self, name: &str) -> Option<&WorkflowNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Validate all structural invariants
    ///
    /// # Errors
    /// - `ModelError::DuplicateNode` for repeated node names
    /// - `ModelError::UnknownNode` for edges or entry naming missing nodes
    /// - `ModelError::SelfLoop` for an edge from a node to itself
    /// - `ModelError::CycleDetected` if the graph is not a DAG
    /// - `ModelError::UnreachableNode` if a node cannot be reached from entry
    /// - `ModelError::ComplexityCeiling` if edge count exceeds `ceiling`
    pub fn validate(&self, ceiling: usize) -> Result<(), ModelError> {
        if self.edges.len() > ceiling {
            return Err(ModelError::ComplexityCeiling {
                edges: self.edges.len(),
                ceiling,
            });
        }

        let mut indices: HashMap<&str, usize> = HashMap::with_capacity(self.nodes.len());
        for (idx, node) in self.nodes.iter().enumerate() {
            if indices.insert(node.name.as_str(), idx).is_some() {
                return Err(ModelError::DuplicateNode {
                    name: node.name.clone(),
                });
            }
        }

        let entry_idx = *indices
            .get(self.entry.as_str())
            .ok_or_else(|| ModelError::UnknownNode {
                name: self.entry.clone(),
            })?;

        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }
        for (from, to) in &self.edges {
            let from_idx = *indices.get(from.as_str()).ok_or_else(|| ModelError::UnknownNode {
                name: from.clone(),
            })?;
            let to_idx = *indices.get(to.as_str()).ok_or_else(|| ModelError::UnknownNode {
                name: to.clone(),
            })?;
            if from_idx == to_idx {
                return Err(ModelError::SelfLoop { name: from.clone() });
            }
            graph.add_edge(from_idx, to_idx, ());
        }

        if is_cyclic_directed(&graph) {
            return Err(ModelError::CycleDetected);
        }

        // Reachability walk from the entry node
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![entry_idx];
        while let Some(idx) = stack.pop() {
            if std::mem::replace(&mut seen[idx], true) {
                continue;
            }
            stack.extend(graph.neighbors_directed(idx, Direction::Outgoing));
        }
        if let Some(idx) = seen.iter().position(|reached| !reached) {
            return Err(ModelError::UnreachableNode {
                name: self.nodes[idx].name.clone(),
            });
        }

        Ok(())
    }

    /// Topological execution order of node names
    ///
    /// # Errors
    /// `ModelError::CycleDetected` if the graph is not a DAG.
    pub fn execution_order(&self) -> Result<Vec<&str>, ModelError> {
        let mut graph: DiGraphMap<usize, ()> = DiGraphMap::new();
        for idx in 0..self.nodes.len() {
            graph.add_node(idx);
        }
        let indices: HashMap<&str, usize> = self
            .nodes
            .iter()
            .enumerate()
            .map(|(idx, n)| (n.name.as_str(), idx))
            .collect();
        for (from, to) in &self.edges {
            if let (Some(&f), Some(&t)) = (indices.get(from.as_str()), indices.get(to.as_str())) {
                graph.add_edge(f, t, ());
            }
        }

        toposort(&graph, None)
            .map(|order| order.into_iter().map(|idx| self.nodes[idx].name.as_str()).collect())
            .map_err(|_| ModelError::CycleDetected)
    }
}

/// A reusable sub-graph pattern offered to the Proposer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatorPattern {
    /// Pattern name (e.g., "ensemble-and-vote")
    pub name: String,
    /// What the pattern does, phrased for the Proposer prompt
    pub description: String,
}

impl OperatorPattern {
    /// Create a pattern
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// The set of patterns a Proposer may draw on when modifying a graph
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OperatorVocabulary {
    /// Available patterns
    pub patterns: Vec<OperatorPattern>,
}

impl OperatorVocabulary {
    /// Create an empty vocabulary
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style pattern addition
    #[inline]
    #[must_use]
    pub fn with_pattern(mut self, pattern: OperatorPattern) -> Self {
        self.patterns.push(pattern);
        self
    }
}
