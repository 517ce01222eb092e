//! Net-effect change tracking for a [`Graph`](crate::graph::Graph).
//!
//! A [`ChangeLog`] remembers the statements a graph held when tracking began (its baseline)
//! and keeps two sets relative to it: statements added since, and baseline statements
//! removed since. It is not an append log; adding and then removing the same statement
//! leaves both sets empty.

use crate::term::Statement;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
    baseline: HashSet<Statement>,
    additions: Vec<Statement>,
    deletions: Vec<Statement>,
}

impl ChangeLog {
    /// Starts tracking against the given baseline with no outstanding changes.
    pub fn new<I>(baseline: I) -> Self
    where
        I: IntoIterator<Item = Statement>,
    {
        ChangeLog {
            baseline: baseline.into_iter().collect(),
            additions: Vec::new(),
            deletions: Vec::new(),
        }
    }

    pub fn additions(&self) -> &[Statement] {
        &self.additions
    }

    pub fn deletions(&self) -> &[Statement] {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.additions.is_empty() && self.deletions.is_empty()
    }

    pub fn baseline_len(&self) -> usize {
        self.baseline.len()
    }

    pub fn record_add(&mut self, statement: Statement) {
        if let Some(pos) = self.deletions.iter().position(|s| *s == statement) {
            self.deletions.remove(pos);
            return;
        }
        if !self.baseline.contains(&statement) && !self.additions.contains(&statement) {
            self.additions.push(statement);
        }
    }

    pub fn record_remove(&mut self, statement: Statement) {
        if let Some(pos) = self.additions.iter().position(|s| *s == statement) {
            self.additions.remove(pos);
            return;
        }
        if self.baseline.contains(&statement) && !self.deletions.contains(&statement) {
            self.deletions.push(statement);
        }
    }

    /// The baseline followed by the outstanding additions.
    pub(crate) fn known_statements(&self) -> impl Iterator<Item = &Statement> {
        self.baseline.iter().chain(self.additions.iter())
    }

    pub(crate) fn rename_local(&mut self, from: &str, to: &str) {
        self.baseline = self
            .baseline
            .iter()
            .map(|s| s.rename_local(from, to))
            .collect();
        for statement in self.additions.iter_mut().chain(self.deletions.iter_mut()) {
            *statement = statement.rename_local(from, to);
        }
    }

    /// Rewrites local nodes everywhere in the log, baseline included.
    pub(crate) fn resolve(&mut self, location: &str) {
        self.baseline = self.baseline.iter().map(|s| s.resolve(location)).collect();
        for statement in self.additions.iter_mut().chain(self.deletions.iter_mut()) {
            *statement = statement.resolve(location);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::{Literal, NamedNode};

    fn title(value: &str) -> Statement {
        Statement::new(
            NamedNode::new("https://x/doc").unwrap(),
            NamedNode::new("http://purl.org/dc/terms/title").unwrap(),
            Literal::new_simple_literal(value),
        )
    }

    #[test]
    fn test_add_then_remove_is_empty() {
        let mut log = ChangeLog::new(vec![]);
        log.record_add(title("B"));
        assert_eq!(log.additions(), &[title("B")]);
        log.record_remove(title("B"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_remove_then_readd_is_empty() {
        let mut log = ChangeLog::new(vec![title("A")]);
        log.record_remove(title("A"));
        assert_eq!(log.deletions(), &[title("A")]);
        log.record_add(title("A"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_no_duplicate_entries() {
        let mut log = ChangeLog::new(vec![title("A")]);
        log.record_add(title("B"));
        log.record_add(title("B"));
        log.record_remove(title("A"));
        log.record_remove(title("A"));
        assert_eq!(log.additions().len(), 1);
        assert_eq!(log.deletions().len(), 1);
    }

    #[test]
    fn test_baseline_statements_are_not_additions() {
        let mut log = ChangeLog::new(vec![title("A")]);
        log.record_add(title("A"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_removing_unknown_statement_is_ignored() {
        let mut log = ChangeLog::new(vec![title("A")]);
        log.record_remove(title("Z"));
        assert!(log.is_empty());
    }

    #[test]
    fn test_replace_value() {
        let mut log = ChangeLog::new(vec![title("A")]);
        log.record_remove(title("A"));
        log.record_add(title("B"));
        assert_eq!(log.deletions(), &[title("A")]);
        assert_eq!(log.additions(), &[title("B")]);
        assert_eq!(log.baseline_len(), 1);
    }
}
