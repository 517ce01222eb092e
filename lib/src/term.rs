//! Terms and statements held by a [`Graph`](crate::graph::Graph).
//!
//! Global identifiers and literals are the `oxigraph` model types. A [`LocalNode`] is a
//! placeholder for an entity that does not have a location yet; it is a separate variant
//! so it can never be mistaken for an IRI, and it is rewritten to `location#name` once the
//! graph is stored.

use oxigraph::model::{
    BlankNode, Literal, NamedNode, NamedNodeRef, NamedOrBlankNode, Term, Triple,
};
use std::fmt;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

/// An identifier that is only meaningful inside the graph that created it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocalNode {
    name: String,
}

impl LocalNode {
    /// `name` must already be fragment-safe, see [`sanitize_local_name`].
    pub(crate) fn new_unchecked(name: String) -> Self {
        LocalNode { name }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the IRI this node becomes once its graph is stored at `location`.
    pub fn resolve(&self, location: &str) -> NamedNode {
        NamedNode::new_unchecked(format!("{}#{}", strip_fragment(location), self.name))
    }
}

impl fmt::Display for LocalNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<#{}>", self.name)
    }
}

/// Reduces a caller-supplied name hint to characters that are valid in an IRI fragment.
/// Returns `None` when nothing usable remains.
pub(crate) fn sanitize_local_name(hint: &str) -> Option<String> {
    let cleaned: String = hint
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_' | '~') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-').to_string();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

pub(crate) fn strip_fragment(location: &str) -> &str {
    location.split('#').next().unwrap_or(location)
}

/// Subject position: anything but a literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Iri(NamedNode),
    Local(LocalNode),
    Blank(BlankNode),
}

impl Node {
    pub fn is_local(&self) -> bool {
        matches!(self, Node::Local(_))
    }

    pub fn as_iri(&self) -> Option<NamedNodeRef<'_>> {
        match self {
            Node::Iri(iri) => Some(iri.as_ref()),
            _ => None,
        }
    }

    fn resolve(&self, location: &str) -> Node {
        match self {
            Node::Local(local) => Node::Iri(local.resolve(location)),
            other => other.clone(),
        }
    }

    fn rename_local(&self, from: &str, to: &str) -> Node {
        match self {
            Node::Local(local) if local.name() == from => {
                Node::Local(LocalNode::new_unchecked(to.to_string()))
            }
            other => other.clone(),
        }
    }

    /// Renders the node for people: IRIs as-is, local nodes as `#name`.
    pub fn to_human(&self) -> String {
        match self {
            Node::Iri(iri) => iri.as_str().to_string(),
            Node::Local(local) => format!("#{}", local.name()),
            Node::Blank(blank) => blank.to_string(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(iri) => write!(f, "{}", iri),
            Node::Local(local) => write!(f, "{}", local),
            Node::Blank(blank) => write!(f, "{}", blank),
        }
    }
}

impl From<NamedNode> for Node {
    fn from(iri: NamedNode) -> Self {
        Node::Iri(iri)
    }
}

impl From<NamedNodeRef<'_>> for Node {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        Node::Iri(iri.into_owned())
    }
}

impl From<LocalNode> for Node {
    fn from(local: LocalNode) -> Self {
        Node::Local(local)
    }
}

impl From<BlankNode> for Node {
    fn from(blank: BlankNode) -> Self {
        Node::Blank(blank)
    }
}

/// Object position.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Node(Node),
    Literal(Literal),
}

impl Value {
    pub fn is_local(&self) -> bool {
        matches!(self, Value::Node(Node::Local(_)))
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Value::Literal(lit) => Some(lit),
            Value::Node(_) => None,
        }
    }

    fn resolve(&self, location: &str) -> Value {
        match self {
            Value::Node(node) => Value::Node(node.resolve(location)),
            Value::Literal(_) => self.clone(),
        }
    }

    fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            Value::Literal(_) => None,
        }
    }

    /// Renders the value for people. Literals show their lexical form; anything but a plain
    /// string also shows its language tag or datatype.
    pub fn to_human(&self) -> String {
        match self {
            Value::Node(node) => node.to_human(),
            Value::Literal(lit) => {
                if let Some(lang) = lit.language() {
                    return format!("\"{}\" ({})", lit.value(), lang);
                }
                let datatype = lit.datatype().as_str();
                if datatype == "http://www.w3.org/2001/XMLSchema#string" {
                    format!("\"{}\"", lit.value())
                } else {
                    let short = datatype.strip_prefix(XSD).unwrap_or(datatype);
                    format!("{} ({})", lit.value(), short)
                }
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(node) => write!(f, "{}", node),
            Value::Literal(lit) => write!(f, "{}", lit),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<NamedNode> for Value {
    fn from(iri: NamedNode) -> Self {
        Value::Node(Node::Iri(iri))
    }
}

impl From<NamedNodeRef<'_>> for Value {
    fn from(iri: NamedNodeRef<'_>) -> Self {
        Value::Node(Node::Iri(iri.into_owned()))
    }
}

impl From<LocalNode> for Value {
    fn from(local: LocalNode) -> Self {
        Value::Node(Node::Local(local))
    }
}

impl From<BlankNode> for Value {
    fn from(blank: BlankNode) -> Self {
        Value::Node(Node::Blank(blank))
    }
}

impl From<Literal> for Value {
    fn from(lit: Literal) -> Self {
        Value::Literal(lit)
    }
}

/// One subject-predicate-object statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Statement {
    pub subject: Node,
    pub predicate: NamedNode,
    pub object: Value,
}

impl Statement {
    pub fn new(
        subject: impl Into<Node>,
        predicate: impl Into<NamedNode>,
        object: impl Into<Value>,
    ) -> Self {
        Statement {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
        }
    }

    /// Converts a parsed triple. Quoted triples in object position are not supported and
    /// yield `None`.
    pub fn from_triple(triple: Triple) -> Option<Self> {
        let subject = match triple.subject {
            NamedOrBlankNode::NamedNode(nn) => Node::Iri(nn),
            NamedOrBlankNode::BlankNode(bn) => Node::Blank(bn),
        };
        let object = match triple.object {
            Term::NamedNode(nn) => Value::Node(Node::Iri(nn)),
            Term::BlankNode(bn) => Value::Node(Node::Blank(bn)),
            Term::Literal(lit) => Value::Literal(lit),
            #[allow(unreachable_patterns)]
            _ => return None,
        };
        Some(Statement {
            subject,
            predicate: triple.predicate,
            object,
        })
    }

    pub fn has_local_nodes(&self) -> bool {
        self.subject.is_local() || self.object.is_local()
    }

    pub(crate) fn local_names(&self) -> impl Iterator<Item = &str> {
        let subject = match &self.subject {
            Node::Local(local) => Some(local.name()),
            _ => None,
        };
        let object = match &self.object {
            Value::Node(Node::Local(local)) => Some(local.name()),
            _ => None,
        };
        subject.into_iter().chain(object)
    }

    pub fn has_blank_nodes(&self) -> bool {
        matches!(self.subject, Node::Blank(_))
            || matches!(self.object, Value::Node(Node::Blank(_)))
    }

    /// Every IRI in the statement, predicate included.
    pub(crate) fn iris(&self) -> impl Iterator<Item = NamedNodeRef<'_>> {
        let object = self.object.as_node().and_then(Node::as_iri);
        self.subject
            .as_iri()
            .into_iter()
            .chain(Some(self.predicate.as_ref()))
            .chain(object)
    }

    /// Renames the local node `from` to `to` wherever it appears.
    pub(crate) fn rename_local(&self, from: &str, to: &str) -> Statement {
        if !self.local_names().any(|name| name == from) {
            return self.clone();
        }
        let object = match &self.object {
            Value::Node(node) => Value::Node(node.rename_local(from, to)),
            literal => literal.clone(),
        };
        Statement {
            subject: self.subject.rename_local(from, to),
            predicate: self.predicate.clone(),
            object,
        }
    }

    /// Rewrites local nodes to `location#name`, leaving everything else untouched.
    pub fn resolve(&self, location: &str) -> Statement {
        if !self.has_local_nodes() {
            return self.clone();
        }
        Statement {
            subject: self.subject.resolve(location),
            predicate: self.predicate.clone(),
            object: self.object.resolve(location),
        }
    }
}

/// N-Triples style, with local nodes written as relative `<#name>` references.
impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} .", self.subject, self.predicate, self.object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    #[test]
    fn test_sanitize_local_name() {
        assert_eq!(sanitize_local_name("1"), Some("1".to_string()));
        assert_eq!(sanitize_local_name("my node"), Some("my-node".to_string()));
        assert_eq!(sanitize_local_name("a#b/c"), Some("a-b-c".to_string()));
        assert_eq!(sanitize_local_name("  "), None);
        assert_eq!(sanitize_local_name("###"), None);
    }

    #[test]
    fn test_local_node_resolution() {
        let local = LocalNode::new_unchecked("me".to_string());
        assert_eq!(local.resolve("https://x/doc"), iri("https://x/doc#me"));
        // an existing fragment on the location is replaced, not nested
        assert_eq!(local.resolve("https://x/doc#it"), iri("https://x/doc#me"));
    }

    #[test]
    fn test_statement_resolution() {
        let local = LocalNode::new_unchecked("1".to_string());
        let st = Statement::new(
            iri("https://x/doc"),
            iri("https://v/knows"),
            local.clone(),
        );
        assert!(st.has_local_nodes());
        let resolved = st.resolve("https://x/doc");
        assert!(!resolved.has_local_nodes());
        assert_eq!(resolved.object, Value::from(iri("https://x/doc#1")));
        assert_eq!(resolved.resolve("https://y/other"), resolved);
    }

    #[test]
    fn test_statement_display() {
        let st = Statement::new(
            LocalNode::new_unchecked("a".to_string()),
            iri("https://v/title"),
            Literal::new_simple_literal("A"),
        );
        assert_eq!(st.to_string(), "<#a> <https://v/title> \"A\" .");
    }

    #[test]
    fn test_human_rendering() {
        assert_eq!(
            Value::from(iri("https://x/doc")).to_human(),
            "https://x/doc"
        );
        assert_eq!(
            Value::from(Literal::new_simple_literal("A")).to_human(),
            "\"A\""
        );
        assert_eq!(
            Value::from(Literal::new_language_tagged_literal_unchecked("Hallo", "de")).to_human(),
            "\"Hallo\" (de)"
        );
        assert_eq!(
            Value::from(Literal::new_typed_literal(
                "42",
                iri("http://www.w3.org/2001/XMLSchema#integer")
            ))
            .to_human(),
            "42 (integer)"
        );
    }
}
