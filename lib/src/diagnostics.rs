//! Human-readable renderings of graphs and their outstanding changes.
//!
//! These are used in error messages and by the CLI. They never feed back into control flow.

use crate::graph::Graph;
use crate::term::{Node, Statement};
use oxigraph::model::NamedNode;
use std::collections::HashSet;
use std::fmt::Write;

/// Renders every statement grouped by subject, then predicate.
pub fn render_graph(graph: &Graph) -> String {
    let mut out = match graph.source_url() {
        Some(url) => format!("# Graph: {url}\n"),
        None => "# Graph (not saved yet)\n".to_string(),
    };
    if graph.is_empty() {
        out.push_str("\n(empty)\n");
        return out;
    }
    for subject in graph.subjects() {
        let _ = write!(out, "\n## Thing: {}\n", subject.to_human());
        let statements: Vec<&Statement> = graph.statements_for_subject(subject).collect();
        for predicate in predicates_in_order(&statements) {
            let _ = write!(out, "\nProperty: {}\n", predicate.as_str());
            for statement in statements.iter().filter(|s| s.predicate == *predicate) {
                let _ = writeln!(out, "- {}", statement.object.to_human());
            }
        }
    }
    out
}

/// Renders the outstanding changes: per subject and predicate, removed values first,
/// then added values.
pub fn render_changes(graph: &Graph) -> String {
    let title = match graph.source_url() {
        Some(url) => format!("# Changes to {url}\n"),
        None => "# Changes (not saved yet)\n".to_string(),
    };
    let Some(log) = graph.change_log() else {
        return format!("{title}\n(changes are not being tracked)\n");
    };
    if log.is_empty() {
        return format!("{title}\n(no unsaved changes)\n");
    }
    let mut out = title;
    let all: Vec<&Statement> = log.deletions().iter().chain(log.additions()).collect();
    for subject in subjects_in_order(&all) {
        let _ = write!(out, "\n## Changes to {}\n", subject.to_human());
        let for_subject: Vec<&Statement> = all
            .iter()
            .filter(|s| s.subject == *subject)
            .copied()
            .collect();
        for predicate in predicates_in_order(&for_subject) {
            let _ = write!(out, "\nProperty {}:\n", predicate.as_str());
            let removed = log
                .deletions()
                .iter()
                .filter(|s| s.subject == *subject && s.predicate == *predicate);
            for statement in removed {
                let _ = writeln!(out, "- Removed: {}", statement.object.to_human());
            }
            let added = log
                .additions()
                .iter()
                .filter(|s| s.subject == *subject && s.predicate == *predicate);
            for statement in added {
                let _ = writeln!(out, "- Added: {}", statement.object.to_human());
            }
        }
    }
    out
}

fn subjects_in_order<'a>(statements: &[&'a Statement]) -> Vec<&'a Node> {
    let mut seen = HashSet::new();
    statements
        .iter()
        .map(|s| &s.subject)
        .filter(|s| seen.insert(*s))
        .collect()
}

fn predicates_in_order<'a>(statements: &[&'a Statement]) -> Vec<&'a NamedNode> {
    let mut seen = HashSet::new();
    statements
        .iter()
        .map(|s| &s.predicate)
        .filter(|p| seen.insert(*p))
        .collect()
}
