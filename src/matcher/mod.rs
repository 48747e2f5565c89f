//! Column-to-property matching
//!
//! Resolves a result column to a path through the target type's property graph
//! without any per-column configuration, using naming conventions only.
//!
//! ## Rule order
//!
//! The first rule producing exactly one candidate wins. A rule that finds several
//! equally valid candidates is ambiguous and falls through to the next rule.
//!
//! 1. **Direct property**: the label names a root-level property exactly
//! 2. **Direct sub-type property**: `<abbreviated path>_<exact leaf>`, where the
//!    abbreviation covers every intermediate property from the root
//! 3. **Sub-type property**: the label names a nested leaf exactly, path ignored
//! 4. Rules 1-3 again with the bare column name, when it differs from the label
//! 5. **Table-prefixed**: `<table>_<label>` (and `<table>_<column>`) where the
//!    abbreviation may cover any run of intermediate properties ending at the leaf
//!
//! ## Example
//!
//! A type with a root `description` and a nested `part.description`:
//!
//! ```text
//! DESCRIPTION                -> description        (rule 1)
//! PART_DESCRIPTION           -> part.description   (rule 2)
//! DESCRIPTION from table PART, no root property
//!                            -> part.description   (rule 5)
//! ```

pub mod naming;
pub mod path;

use std::any::TypeId;
use std::collections::HashSet;
use std::fmt;

use crate::entity::{Entity, PropertyKind, TypeDescriptor};
use crate::source::ColumnMeta;
use naming::{abbreviates_all, exact, leaf_splits, words};
pub use path::{CandidateProperty, PropertyNode, PropertyPath};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchRule {
    DirectProperty,
    DirectSubTypeProperty,
    SubTypeProperty,
    TablePrefixed,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MatchRule::DirectProperty => "direct property",
            MatchRule::DirectSubTypeProperty => "direct sub-type property",
            MatchRule::SubTypeProperty => "sub-type property",
            MatchRule::TablePrefixed => "table-prefixed sub-type property",
        };
        write!(f, "{}", name)
    }
}

/// Matches result columns against the flattened leaf properties of one type
#[derive(Debug, Clone)]
pub struct PropertyMatcher {
    type_name: &'static str,
    candidates: Vec<CandidateProperty>,
}

impl PropertyMatcher {
    pub fn for_type<T: Entity>() -> Self {
        Self::new(T::descriptor())
    }

    /// Index every reachable leaf property of `descriptor`
    pub fn new(descriptor: &'static TypeDescriptor) -> Self {
        let mut candidates = Vec::new();
        let mut seen = HashSet::new();
        collect_candidates(descriptor, &[], &[descriptor.type_id()], &mut seen, &mut candidates);

        log::debug!(
            "Indexed {} candidate properties for {}",
            candidates.len(),
            descriptor.type_name()
        );

        PropertyMatcher {
            type_name: descriptor.type_name(),
            candidates,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn candidates(&self) -> &[CandidateProperty] {
        &self.candidates
    }

    /// Match using the label, owning table and bare name from column metadata
    pub fn match_meta(&self, column: &ColumnMeta) -> Option<PropertyPath> {
        self.match_column(&column.label, &column.table_name, &column.column_name)
    }

    /// Resolve one column to a property path, or None when no rule matches
    ///
    /// `table_name` and `column_name` may be empty when the driver cannot supply them.
    pub fn match_column(
        &self,
        label: &str,
        table_name: &str,
        column_name: &str,
    ) -> Option<PropertyPath> {
        let label_tokens = words(label);
        let column_differs = !column_name.is_empty() && !column_name.eq_ignore_ascii_case(label);
        let column_tokens = if column_differs {
            words(column_name)
        } else {
            Vec::new()
        };

        let found = self
            .match_name(label, &label_tokens)
            .or_else(|| {
                column_differs
                    .then(|| self.match_name(column_name, &column_tokens))
                    .flatten()
            })
            .or_else(|| {
                if table_name.is_empty() {
                    return None;
                }
                let table_tokens = words(table_name);
                self.match_table_prefixed(table_name, label, &table_tokens, &label_tokens)
                    .or_else(|| {
                        column_differs
                            .then(|| {
                                self.match_table_prefixed(
                                    table_name,
                                    column_name,
                                    &table_tokens,
                                    &column_tokens,
                                )
                            })
                            .flatten()
                    })
            });

        if found.is_none() {
            log::debug!(
                "No property of {} matches column {} (table {:?}, column {:?})",
                self.type_name,
                label,
                table_name,
                column_name
            );
        }
        found.map(|c| c.path().clone())
    }

    /// Rules 1-3 against one name
    fn match_name(&self, name: &str, tokens: &[String]) -> Option<&CandidateProperty> {
        if tokens.is_empty() {
            return None;
        }

        self.unique(MatchRule::DirectProperty, name, |c| {
            c.depth() == 1 && exact(tokens, c.leaf_segment())
        })
        .or_else(|| {
            self.unique(MatchRule::DirectSubTypeProperty, name, |c| {
                let parents = &c.segments()[..c.depth() - 1];
                c.depth() > 1
                    && leaf_splits(tokens, c.leaf_segment())
                        .any(|head| abbreviates_all(head, parents))
            })
        })
        .or_else(|| {
            self.unique(MatchRule::SubTypeProperty, name, |c| {
                c.depth() > 1 && exact(tokens, c.leaf_segment())
            })
        })
    }

    /// Rule 5: the table name abbreviates any run of parents ending at the leaf
    fn match_table_prefixed(
        &self,
        table_name: &str,
        name: &str,
        table_tokens: &[String],
        tokens: &[String],
    ) -> Option<&CandidateProperty> {
        if tokens.is_empty() || table_tokens.is_empty() {
            return None;
        }
        let prefixed: Vec<String> = table_tokens.iter().chain(tokens).cloned().collect();
        let display = format!("{}_{}", table_name, name);

        self.unique(MatchRule::TablePrefixed, &display, |c| {
            let parents = &c.segments()[..c.depth() - 1];
            c.depth() > 1
                && leaf_splits(&prefixed, c.leaf_segment()).any(|head| {
                    (0..parents.len()).any(|start| abbreviates_all(head, &parents[start..]))
                })
        })
    }

    fn unique<F>(&self, rule: MatchRule, name: &str, predicate: F) -> Option<&CandidateProperty>
    where
        F: Fn(&CandidateProperty) -> bool,
    {
        let mut matches = self.candidates.iter().filter(|c| predicate(c));
        let first = matches.next()?;
        let rest: Vec<&str> = matches.map(|c| c.dotted_name()).collect();

        if rest.is_empty() {
            log::debug!(
                "Column {} matched {}.{} by {} rule",
                name,
                self.type_name,
                first.dotted_name(),
                rule
            );
            Some(first)
        } else {
            log::debug!(
                "Column {} is ambiguous under the {} rule: {}, {}",
                name,
                rule,
                first.dotted_name(),
                rest.join(", ")
            );
            None
        }
    }
}

/// Depth-first walk collecting leaf properties
///
/// `prefix` is the path down to `descriptor`; `visiting` holds the types on that
/// path so an un-ignored cycle is cut instead of recursing forever.
fn collect_candidates(
    descriptor: &'static TypeDescriptor,
    prefix: &[PropertyNode],
    visiting: &[TypeId],
    seen: &mut HashSet<String>,
    out: &mut Vec<CandidateProperty>,
) {
    for property in descriptor.properties() {
        let mut nodes = prefix.to_vec();
        nodes.push(property);

        match property.kind() {
            PropertyKind::Leaf { .. } => {
                let Some(path) = PropertyPath::new(nodes) else {
                    continue;
                };
                let candidate = CandidateProperty::new(path);
                if !seen.insert(candidate.dotted_name().to_string()) {
                    log::warn!(
                        "Duplicate property path {} in {}; keeping the first",
                        candidate.dotted_name(),
                        descriptor.type_name()
                    );
                    continue;
                }
                out.push(candidate);
            }
            PropertyKind::Nested { descriptor: child, .. } => {
                let child = child();
                if visiting.contains(&child.type_id()) {
                    log::warn!(
                        "Property {}.{} closes a cycle back to {}; mark it `ignore` to silence this",
                        descriptor.type_name(),
                        property.name(),
                        child.type_name()
                    );
                    continue;
                }
                let mut path_types = visiting.to_vec();
                path_types.push(child.type_id());
                collect_candidates(child, &nodes, &path_types, seen, out);
            }
            PropertyKind::Opaque | PropertyKind::Ignored => {}
        }
    }
}
