use std::fmt;

use crate::entity::{PropertyDescriptor, ValueType};

use super::naming::Segment;

/// One step of a property path
pub type PropertyNode = &'static PropertyDescriptor;

/// Ordered, non-empty chain of properties from the root type down to a leaf
#[derive(Clone)]
pub struct PropertyPath {
    nodes: Vec<PropertyNode>,
}

impl PropertyPath {
    /// Returns None for an empty node list
    pub fn new(nodes: Vec<PropertyNode>) -> Option<Self> {
        if nodes.is_empty() {
            None
        } else {
            Some(PropertyPath { nodes })
        }
    }

    pub fn nodes(&self) -> &[PropertyNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf(&self) -> PropertyNode {
        self.nodes[self.nodes.len() - 1]
    }

    /// Intermediate (nested) properties, root side first
    pub fn parents(&self) -> &[PropertyNode] {
        &self.nodes[..self.nodes.len() - 1]
    }

    pub fn value_type(&self) -> Option<ValueType> {
        self.leaf().value_type()
    }

    /// Property names joined with `.`, e.g. `part.description`
    pub fn dotted_name(&self) -> String {
        dotted(&self.nodes)
    }
}

pub(crate) fn dotted(nodes: &[PropertyNode]) -> String {
    nodes
        .iter()
        .map(|n| n.name())
        .collect::<Vec<_>>()
        .join(".")
}

impl PartialEq for PropertyPath {
    fn eq(&self, other: &Self) -> bool {
        self.nodes.len() == other.nodes.len()
            && self
                .nodes
                .iter()
                .zip(&other.nodes)
                .all(|(a, b)| std::ptr::eq(*a, *b))
    }
}

impl Eq for PropertyPath {}

impl fmt::Debug for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyPath({})", self.dotted_name())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dotted_name())
    }
}

/// A reachable leaf property in the matcher's index
#[derive(Debug, Clone)]
pub struct CandidateProperty {
    dotted_name: String,
    path: PropertyPath,
    segments: Vec<Segment>,
}

impl CandidateProperty {
    pub(crate) fn new(path: PropertyPath) -> Self {
        let segments = path.nodes().iter().map(|n| Segment::new(n.name())).collect();
        CandidateProperty {
            dotted_name: path.dotted_name(),
            path,
            segments,
        }
    }

    pub fn dotted_name(&self) -> &str {
        &self.dotted_name
    }

    pub fn path(&self) -> &PropertyPath {
        &self.path
    }

    pub fn depth(&self) -> usize {
        self.path.len()
    }

    pub(crate) fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub(crate) fn leaf_segment(&self) -> &Segment {
        &self.segments[self.segments.len() - 1]
    }
}
