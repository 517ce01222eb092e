//! The in-memory graph the engine synchronizes.
//!
//! A [`Graph`] is an owned set of [`Statement`]s that remembers insertion order. It may
//! carry [`ResourceInfo`] (it was fetched or saved) and a [`ChangeLog`] (mutations are being
//! tracked). Both are explicit optional fields: a graph without resource info has never been
//! persisted, and only graphs with both are eligible for partial updates.

use crate::changelog::ChangeLog;
use crate::metadata::ResourceInfo;
use crate::term::{sanitize_local_name, LocalNode, Node, Statement, Value};
use log::warn;
use oxigraph::model::{NamedNode, NamedNodeRef};
use rand::Rng;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct Graph {
    statements: Vec<Statement>,
    members: HashSet<Statement>,
    // every local name handed out by this graph, resolved or not
    local_names: HashSet<String>,
    resource: Option<ResourceInfo>,
    changes: Option<ChangeLog>,
}

impl Graph {
    /// Creates an empty graph that has never been persisted and is not tracked.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Iterates statements in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Statement> {
        self.statements.iter()
    }

    pub fn contains(&self, statement: &Statement) -> bool {
        self.members.contains(statement)
    }

    /// Returns true when both graphs hold the same statements, ignoring order and metadata.
    pub fn same_statements(&self, other: &Graph) -> bool {
        self.members == other.members
    }

    /// Adds a statement. Returns false, and records nothing, if it was already present.
    pub fn insert(&mut self, statement: Statement) -> bool {
        if !self.members.insert(statement.clone()) {
            return false;
        }
        for name in statement.local_names() {
            self.local_names.insert(name.to_string());
        }
        if let Some(log) = &mut self.changes {
            log.record_add(statement.clone());
        }
        self.statements.push(statement);
        true
    }

    /// Removes a statement. Returns false, and records nothing, if it was absent.
    pub fn remove(&mut self, statement: &Statement) -> bool {
        if !self.members.remove(statement) {
            return false;
        }
        self.statements.retain(|s| s != statement);
        if let Some(log) = &mut self.changes {
            log.record_remove(statement.clone());
        }
        true
    }

    /// Removes every value of `predicate` on `subject` and adds `object` instead.
    pub fn set(&mut self, subject: Node, predicate: NamedNode, object: Value) {
        let existing: Vec<Statement> = self
            .statements
            .iter()
            .filter(|s| s.subject == subject && s.predicate == predicate)
            .cloned()
            .collect();
        for statement in &existing {
            self.remove(statement);
        }
        self.insert(Statement::new(subject, predicate, object));
    }

    /// Distinct subjects in order of first appearance.
    pub fn subjects(&self) -> Vec<&Node> {
        let mut seen = HashSet::new();
        self.statements
            .iter()
            .map(|s| &s.subject)
            .filter(|s| seen.insert(*s))
            .collect()
    }

    pub fn statements_for_subject<'a>(
        &'a self,
        subject: &'a Node,
    ) -> impl Iterator<Item = &'a Statement> + 'a {
        self.statements.iter().filter(move |s| s.subject == *subject)
    }

    pub fn objects_for_subject_predicate<'a>(
        &'a self,
        subject: &'a Node,
        predicate: NamedNodeRef<'a>,
    ) -> impl Iterator<Item = &'a Value> + 'a {
        self.statements
            .iter()
            .filter(move |s| s.subject == *subject && s.predicate == predicate)
            .map(|s| &s.object)
    }

    /// Creates a local node unique within this graph.
    ///
    /// The hint is reduced to fragment-safe characters; when it is taken, either by another
    /// local node or by an IRI that already sits at `location#hint`, a numeric suffix is
    /// added. Without a usable hint a random name is generated.
    pub fn create_local_node(&mut self, name_hint: Option<&str>) -> LocalNode {
        let base = name_hint.and_then(sanitize_local_name);
        let name = match base {
            Some(base) => {
                let mut candidate = base.clone();
                let mut n = 1;
                while self.local_name_taken(&candidate) {
                    n += 1;
                    candidate = format!("{base}-{n}");
                }
                candidate
            }
            None => {
                let mut rng = rand::rng();
                loop {
                    let candidate = format!("node-{:08x}", rng.random::<u32>());
                    if !self.local_name_taken(&candidate) {
                        break candidate;
                    }
                }
            }
        };
        self.local_names.insert(name.clone());
        LocalNode::new_unchecked(name)
    }

    fn local_name_taken(&self, name: &str) -> bool {
        self.local_names.contains(name) || self.iri_taken(name, self.source_url())
    }

    /// Whether an IRI this graph holds, or held when tracking began, is the one `name`
    /// becomes at `location`. Without a location any IRI with that fragment counts.
    fn iri_taken(&self, name: &str, location: Option<&str>) -> bool {
        let known = self
            .statements
            .iter()
            .chain(self.changes.iter().flat_map(|log| log.known_statements()));
        let mut iris = known.flat_map(|s| s.iris());
        match location {
            Some(location) => {
                let target = LocalNode::new_unchecked(name.to_string()).resolve(location);
                iris.any(|iri| iri == target.as_ref())
            }
            None => iris.any(|iri| {
                iri.as_str()
                    .split_once('#')
                    .is_some_and(|(_, fragment)| fragment == name)
            }),
        }
    }

    /// Renames every local node whose IRI at `location` is already taken, so that storing
    /// the graph never merges a new entity into a persisted one. `None` stands for a
    /// location the store has not assigned yet.
    pub(crate) fn separate_local_nodes(&mut self, location: Option<&str>) {
        let mut names: Vec<String> = Vec::new();
        for name in self.statements.iter().flat_map(|s| s.local_names()) {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        for name in names {
            if !self.iri_taken(&name, location) {
                continue;
            }
            let mut n = 1;
            let renamed = loop {
                n += 1;
                let candidate = format!("{name}-{n}");
                if !self.local_names.contains(&candidate) && !self.iri_taken(&candidate, location)
                {
                    break candidate;
                }
            };
            warn!(
                "Local node #{} would collide with an existing IRI, using #{}",
                name, renamed
            );
            self.rename_local(&name, &renamed);
        }
    }

    fn rename_local(&mut self, from: &str, to: &str) {
        let statements = std::mem::take(&mut self.statements);
        self.members.clear();
        for statement in statements {
            let renamed = statement.rename_local(from, to);
            if self.members.insert(renamed.clone()) {
                self.statements.push(renamed);
            }
        }
        if let Some(log) = &mut self.changes {
            log.rename_local(from, to);
        }
        self.local_names.insert(to.to_string());
    }

    pub fn has_local_nodes(&self) -> bool {
        self.statements.iter().any(|s| s.has_local_nodes())
    }

    /// Snapshots the current statements as the baseline and starts an empty change log,
    /// replacing any previous one.
    pub fn begin_tracking(&mut self) {
        self.changes = Some(ChangeLog::new(self.statements.iter().cloned()));
    }

    pub fn change_log(&self) -> Option<&ChangeLog> {
        self.changes.as_ref()
    }

    pub fn is_tracked(&self) -> bool {
        self.changes.is_some()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.changes.as_ref().is_some_and(|log| !log.is_empty())
    }

    pub fn resource_info(&self) -> Option<&ResourceInfo> {
        self.resource.as_ref()
    }

    /// The location this graph was fetched from or last saved to.
    pub fn source_url(&self) -> Option<&str> {
        self.resource.as_ref().map(|r| r.url.as_str())
    }

    pub fn is_persisted(&self) -> bool {
        self.resource.is_some()
    }

    pub(crate) fn set_resource_info(&mut self, info: ResourceInfo) {
        self.resource = Some(info);
    }

    /// Rewrites local nodes to `location#name` in the statements and the change log.
    /// Resolution is not a mutation and is never recorded as one.
    pub(crate) fn resolve_in_place(&mut self, location: &str) {
        if !self.has_local_nodes() {
            return;
        }
        self.separate_local_nodes(Some(location));
        let statements = std::mem::take(&mut self.statements);
        self.members.clear();
        for statement in statements {
            let resolved = statement.resolve(location);
            if self.members.insert(resolved.clone()) {
                self.statements.push(resolved);
            }
        }
        if let Some(log) = &mut self.changes {
            log.resolve(location);
        }
    }
}

/// Returns a copy of `graph` with every local node rewritten to `location#name`. A local
/// node whose IRI is already in use is renamed first. Resolving a graph without local
/// nodes returns an identical copy.
pub fn resolve_local_nodes(graph: &Graph, location: &str) -> Graph {
    let mut resolved = graph.clone();
    resolved.resolve_in_place(location);
    resolved
}

impl FromIterator<Statement> for Graph {
    fn from_iter<I: IntoIterator<Item = Statement>>(iter: I) -> Self {
        let mut graph = Graph::new();
        for statement in iter {
            graph.insert(statement);
        }
        graph
    }
}
