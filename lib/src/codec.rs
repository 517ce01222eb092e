//! Encoding graphs as Turtle and decoding store payloads into graphs.
//!
//! Encoding is done here rather than through `RdfSerializer` because local nodes have to be
//! written as relative `<#name>` references: when a graph is posted into a container the
//! final location is only known to the store, which resolves them against it. Decoding is
//! delegated to `oxigraph`'s parsers with the resource location as base IRI.

use crate::graph::Graph;
use crate::term::{Node, Statement};
use anyhow::Result;
use log::{debug, warn};
use oxigraph::io::{RdfFormat, RdfParser};
use oxigraph::model::Triple;
use std::collections::HashSet;
use std::fmt::Write;

/// Serializes the graph as Turtle, one block per subject in order of first appearance.
pub fn encode_turtle(graph: &Graph) -> String {
    let mut out = String::new();
    for subject in graph.subjects() {
        let statements: Vec<&Statement> = graph.statements_for_subject(subject).collect();
        write_subject_block(&mut out, subject, &statements);
    }
    out
}

fn write_subject_block(out: &mut String, subject: &Node, statements: &[&Statement]) {
    // predicates in order of first appearance, objects grouped under them
    let mut predicates = Vec::new();
    let mut seen = HashSet::new();
    for statement in statements {
        if seen.insert(&statement.predicate) {
            predicates.push(&statement.predicate);
        }
    }
    let _ = write!(out, "{subject}");
    for (i, predicate) in predicates.iter().enumerate() {
        let objects: Vec<String> = statements
            .iter()
            .filter(|s| s.predicate == **predicate)
            .map(|s| s.object.to_string())
            .collect();
        let sep = if i == 0 { " " } else { " ;\n    " };
        let _ = write!(out, "{sep}{predicate} {}", objects.join(", "));
    }
    out.push_str(" .\n");
}

/// Parses `bytes` as `format` into a new, untracked graph. Relative references resolve
/// against `base`. Quoted triples are skipped.
pub fn decode(bytes: &[u8], format: RdfFormat, base: &str) -> Result<Graph> {
    let parser = RdfParser::from_format(format)
        .with_base_iri(base)?
        .without_named_graphs();
    let mut graph = Graph::new();
    for quad in parser.for_reader(bytes) {
        let quad = quad?;
        let triple = Triple::new(quad.subject, quad.predicate, quad.object);
        match Statement::from_triple(triple) {
            Some(statement) => {
                graph.insert(statement);
            }
            None => warn!("Skipping unsupported quoted triple in {}", base),
        }
    }
    debug!("Decoded {} statements from {}", graph.len(), base);
    Ok(graph)
}

/// Decodes Turtle, the format the engine writes.
pub fn decode_turtle(text: &str, base: &str) -> Result<Graph> {
    decode(text.as_bytes(), RdfFormat::Turtle, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::resolve_local_nodes;
    use oxigraph::model::{Literal, NamedNode};

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    fn sample() -> Graph {
        let mut graph = Graph::new();
        let me = graph.create_local_node(Some("me"));
        graph.insert(Statement::new(
            iri("https://x/doc"),
            iri("http://purl.org/dc/terms/title"),
            Literal::new_simple_literal("A \"quoted\" title"),
        ));
        graph.insert(Statement::new(
            iri("https://x/doc"),
            iri("http://xmlns.com/foaf/0.1/maker"),
            me.clone(),
        ));
        graph.insert(Statement::new(
            me.clone(),
            iri("http://xmlns.com/foaf/0.1/nick"),
            Literal::new_simple_literal("one"),
        ));
        graph.insert(Statement::new(
            me,
            iri("http://xmlns.com/foaf/0.1/nick"),
            Literal::new_language_tagged_literal_unchecked("eins", "de"),
        ));
        graph
    }

    #[test]
    fn test_encode_groups_by_subject() {
        let text = encode_turtle(&sample());
        let expected = "<https://x/doc> <http://purl.org/dc/terms/title> \"A \\\"quoted\\\" title\" ;\n    \
                        <http://xmlns.com/foaf/0.1/maker> <#me> .\n\
                        <#me> <http://xmlns.com/foaf/0.1/nick> \"one\", \"eins\"@de .\n";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_round_trip() {
        let graph = sample();
        let decoded = decode_turtle(&encode_turtle(&graph), "https://x/doc").unwrap();
        let expected = resolve_local_nodes(&graph, "https://x/doc");
        assert!(decoded.same_statements(&expected));
        assert!(decoded.change_log().is_none());
        assert!(decoded.resource_info().is_none());
    }

    #[test]
    fn test_empty_graph() {
        assert_eq!(encode_turtle(&Graph::new()), "");
        assert!(decode_turtle("", "https://x/doc").unwrap().is_empty());
    }

    #[test]
    fn test_decode_resolves_relative_references() {
        let text = "@prefix dc: <http://purl.org/dc/terms/> .\n<> dc:title \"T\" .\n<#it> dc:isPartOf <> .";
        let graph = decode_turtle(text, "https://x/doc").unwrap();
        assert_eq!(graph.len(), 2);
        assert!(graph.contains(&Statement::new(
            iri("https://x/doc#it"),
            iri("http://purl.org/dc/terms/isPartOf"),
            iri("https://x/doc")
        )));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(decode_turtle("<https://x/a> <https://v/p> .", "https://x/doc").is_err());
    }
}
