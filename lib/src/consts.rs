//! Defines constant IRIs, media types and header values shared by the synchronization
//! engine, primarily from the LDP and Solid vocabularies.

use oxigraph::model::NamedNodeRef;

// ldp
pub const LDP_BASIC_CONTAINER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/ns/ldp#BasicContainer");

// link relations that are IRIs rather than registered tokens
pub const REL_ACCESS_CONTROL: &str = "http://www.w3.org/ns/solid/acp#accessControl";
pub const REL_STORAGE_DESCRIPTION: &str = "http://www.w3.org/ns/solid/terms#storageDescription";

// media types
pub const TURTLE: &str = "text/turtle";
pub const SPARQL_UPDATE: &str = "application/sparql-update";

// non-standard headers
pub const WAC_ALLOW: &str = "wac-allow";
pub const SLUG: &str = "slug";

/// Body returned by Node Solid Server when asked to create a container with `PUT`.
pub const NSS_CONTAINER_PUT_REJECTION: &str =
    "Can't write file: PUT not supported on containers, use POST instead";

/// Name of the throwaway child used to force a container into existence.
pub const CONTAINER_PLACEHOLDER: &str = ".dummy";
