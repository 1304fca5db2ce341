//! Statement accumulators
//!
//! [`RdfState`] collects the statements a write operation wants to add and
//! delete. [`StateSnapshot`] holds the statements read for one resource. The
//! two are separate types so that one instance never serves both modes.

use crate::rdf::{rdf_type, NamedNode, Quad, RdfObject, RdfSubject};
use indexmap::IndexSet;

/// Net change computed by a write operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RdfDiff {
    pub adds: Vec<Quad>,
    pub deletes: Vec<Quad>,
}

impl RdfDiff {
    pub fn is_empty(&self) -> bool {
        self.adds.is_empty() && self.deletes.is_empty()
    }
}

/// Add and delete sets of a write operation
#[derive(Debug, Default)]
pub struct RdfState {
    to_add: IndexSet<Quad>,
    to_delete: IndexSet<Quad>,
}

impl RdfState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_add(&mut self, quad: Quad) {
        self.to_add.insert(quad);
    }

    pub fn record_delete(&mut self, quad: Quad) {
        self.to_delete.insert(quad);
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }

    /// Number of recorded additions, before cancellation
    pub fn pending_adds(&self) -> usize {
        self.to_add.len()
    }

    /// Number of recorded deletions, before cancellation
    pub fn pending_deletes(&self) -> usize {
        self.to_delete.len()
    }

    /// Disjoint add and delete sets. A quad recorded on both sides is dropped
    /// from both.
    pub fn finalize_diff(self) -> RdfDiff {
        let RdfState {
            mut to_add,
            mut to_delete,
        } = self;
        to_add.retain(|quad| !to_delete.shift_remove(quad));
        RdfDiff {
            adds: to_add.into_iter().collect(),
            deletes: to_delete.into_iter().collect(),
        }
    }
}

/// Statements fetched for one resource, in store order
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    resource: NamedNode,
    quads: Vec<Quad>,
}

impl StateSnapshot {
    /// Wrap the statements in which `resource` is the subject or the object
    pub fn for_resource(resource: NamedNode, quads: Vec<Quad>) -> Self {
        Self { resource, quads }
    }

    pub fn resource(&self) -> &NamedNode {
        &self.resource
    }

    pub fn quads(&self) -> &[Quad] {
        &self.quads
    }

    /// Objects of `(resource, predicate, ?)`, restricted to `context` if given
    pub fn objects<'s>(
        &'s self,
        predicate: &'s NamedNode,
        context: Option<&'s NamedNode>,
    ) -> impl Iterator<Item = &'s RdfObject> + 's {
        self.quads
            .iter()
            .filter(move |q| self.is_subject(&q.subject))
            .filter(move |q| q.predicate.as_named_node() == predicate)
            .filter(move |q| in_context(q, context))
            .map(|q| &q.object)
    }

    /// Subjects of `(?, predicate, resource)`, restricted to `context` if given
    pub fn subjects<'s>(
        &'s self,
        predicate: &'s NamedNode,
        context: Option<&'s NamedNode>,
    ) -> impl Iterator<Item = &'s NamedNode> + 's {
        self.quads
            .iter()
            .filter(move |q| q.object.as_named_node() == Some(&self.resource))
            .filter(move |q| q.predicate.as_named_node() == predicate)
            .filter(move |q| in_context(q, context))
            .filter_map(|q| q.subject.as_named_node())
    }

    /// True when the resource is typed with `class`
    pub fn has_type(&self, class: &NamedNode) -> bool {
        let rdf_type = rdf_type();
        self.quads.iter().any(|q| {
            self.is_subject(&q.subject)
                && q.predicate == rdf_type
                && q.object.as_named_node() == Some(class)
        })
    }

    /// Graph holding the `(resource, rdf:type, class)` statement
    pub fn type_context(&self, class: &NamedNode) -> Option<&NamedNode> {
        let rdf_type = rdf_type();
        self.quads
            .iter()
            .find(|q| {
                self.is_subject(&q.subject)
                    && q.predicate == rdf_type
                    && q.object.as_named_node() == Some(class)
            })
            .and_then(|q| q.graph.as_ref())
    }

    fn is_subject(&self, subject: &RdfSubject) -> bool {
        subject.as_named_node() == Some(&self.resource)
    }
}

fn in_context(quad: &Quad, context: Option<&NamedNode>) -> bool {
    context.map_or(true, |g| quad.graph.as_ref() == Some(g))
}
