//! Reading graphs from, and writing them back to, a Solid-style store.
//!
//! Every operation is a single exchange through the [`Fetcher`] the caller passes in; there
//! is no shared default and no retrying. A failed exchange surfaces as a [`FetchError`]
//! carrying the response, and for writes the message embeds what was sent.
//!
//! Saving picks between two strategies (see [`SaveStrategy`]):
//!
//! 1. A graph fetched from (or last saved to) the target location, with its change log, is
//!    written with a `PATCH` that deletes exactly the statements the engine believes are
//!    stored and inserts the new ones. A store that no longer holds a listed statement can
//!    reject the update, which surfaces the conflict instead of silently diverging.
//! 2. Anything else is written with a full `PUT`, asserting `If-None-Match: *` when the graph
//!    has never been stored at that location. This includes stored graphs whose deletions
//!    involve blank nodes, which a SPARQL `DELETE DATA` cannot express.
//!
//! Saving never mutates its input; it returns a new graph carrying fresh metadata, an empty
//! change log and no local nodes. A local node whose IRI at the target is already in use,
//! in the graph or in what was fetched, is renamed with a numeric suffix first.

use crate::codec::{decode, encode_turtle};
use crate::consts::{
    CONTAINER_PLACEHOLDER, LDP_BASIC_CONTAINER, NSS_CONTAINER_PUT_REJECTION, SLUG, SPARQL_UPDATE,
    TURTLE, WAC_ALLOW,
};
use crate::diagnostics::{render_changes, render_graph};
use crate::errors::{FetchError, MissingHeaderError, NotAContainerError, UnknownLocationError};
use crate::graph::{resolve_local_nodes, Graph};
use crate::http::{Fetcher, Request, Response};
use crate::metadata::{
    is_container, parse_last_modified, parse_link_headers, parse_response, parse_wac_allow,
    ResourceInfo,
};
use crate::term::Statement;
use anyhow::{anyhow, Result};
use log::{debug, info, warn};
use oxigraph::io::RdfFormat;
use reqwest::header::{
    HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, IF_NONE_MATCH, LINK, LOCATION,
};
use reqwest::StatusCode;
use url::Url;

/// How a graph will be written to a location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStrategy {
    /// Send only the change log as a SPARQL update.
    PartialPatch,
    /// Send the whole graph. `create_only` asserts the target does not exist yet.
    FullReplace { create_only: bool },
}

impl SaveStrategy {
    /// A graph is patched only if it carries resource info for exactly `url` and a change
    /// log; everything else is replaced.
    ///
    /// `DELETE DATA` cannot name blank nodes, so a patch-eligible graph whose deletions
    /// involve one replaces the stored resource instead.
    pub fn select(graph: &Graph, url: &str) -> Self {
        let stored_here = graph.source_url() == Some(url);
        let Some(log) = graph.change_log().filter(|_| stored_here) else {
            return SaveStrategy::FullReplace {
                create_only: !stored_here,
            };
        };
        if log.deletions().iter().any(Statement::has_blank_nodes) {
            debug!("Deletions involve blank nodes, replacing {} instead", url);
            return SaveStrategy::FullReplace { create_only: false };
        }
        SaveStrategy::PartialPatch
    }
}

fn failure(action: &str, url: &str, response: Response) -> anyhow::Error {
    let message = format!(
        "{action} [{url}] failed: [{}] [{}].",
        response.status.as_u16(),
        response.status_text
    );
    anyhow!(FetchError::new(message, response))
}

fn failure_with_payload(
    action: &str,
    url: &str,
    response: Response,
    payload: &str,
) -> anyhow::Error {
    let message = format!(
        "{action} [{url}] failed: [{}] [{}].\n\nThe payload that was sent is listed below.\n\n{payload}",
        response.status.as_u16(),
        response.status_text
    );
    anyhow!(FetchError::new(message, response))
}

fn container_type_link() -> Result<HeaderValue> {
    Ok(HeaderValue::from_str(&format!(
        "<{}>; rel=\"type\"",
        LDP_BASIC_CONTAINER.as_str()
    ))?)
}

fn slug_header(request: Request, slug: Option<&str>) -> Result<Request> {
    match slug {
        Some(slug) => Ok(request.header(
            HeaderName::from_static(SLUG),
            HeaderValue::from_str(slug)?,
        )),
        None => Ok(request),
    }
}

/// Metadata for a graph that has just been written to `url`. Links and permission hints
/// come from the response; when it has none, those of `previous` are kept as long as it
/// describes the same location.
fn saved_resource_info(
    response: &Response,
    url: &str,
    previous: Option<&ResourceInfo>,
) -> ResourceInfo {
    let mut info = ResourceInfo::for_graph(url);
    info.linked_resources = parse_link_headers(&response.headers, url);
    info.permissions = response.header(WAC_ALLOW).map(parse_wac_allow);
    info.last_modified = parse_last_modified(response);
    if let Some(previous) = previous.filter(|p| p.url == url) {
        if info.linked_resources.is_empty() {
            info.linked_resources = previous.linked_resources.clone();
        }
        if info.permissions.is_none() {
            info.permissions = previous.permissions;
        }
    }
    info
}

/// Fetches the graph at `url` and starts tracking changes against it.
pub fn get_graph(url: &str, fetcher: &dyn Fetcher) -> Result<Graph> {
    let request = Request::get(url).header(ACCEPT, HeaderValue::from_static(TURTLE));
    let response = fetcher.fetch(request)?;
    if !response.is_success() {
        return Err(failure("Fetching the Resource at", url, response));
    }
    let resource = parse_response(&response, url);
    let format = resource.rdf_format().unwrap_or(RdfFormat::Turtle);
    let mut graph = decode(&response.body, format, &resource.url)?;
    graph.set_resource_info(resource);
    graph.begin_tracking();
    info!("Fetched {} statements from {}", graph.len(), url);
    Ok(graph)
}

/// Retrieves the metadata of the resource at `url` without its content.
pub fn get_resource_info(url: &str, fetcher: &dyn Fetcher) -> Result<ResourceInfo> {
    let response = fetcher.fetch(Request::head(url))?;
    if !response.is_success() {
        return Err(failure("Reading the metadata of the Resource at", url, response));
    }
    Ok(parse_response(&response, url))
}

/// Builds the SPARQL update for a change log: a `DELETE DATA` clause for the deletions,
/// then an `INSERT DATA` clause for the additions. Empty clauses are left out.
pub fn build_patch_body(deletions: &[Statement], additions: &[Statement]) -> String {
    let mut body = String::new();
    for (clause, statements) in [("DELETE DATA", deletions), ("INSERT DATA", additions)] {
        if statements.is_empty() {
            continue;
        }
        body.push_str(clause);
        body.push_str(" {\n");
        for statement in statements {
            body.push_str(&statement.to_string());
            body.push('\n');
        }
        body.push_str("};\n");
    }
    body
}

/// Saves `graph` at `url` and returns the stored version of it. `graph` is left untouched.
pub fn save_graph_at(url: &str, graph: &Graph, fetcher: &dyn Fetcher) -> Result<Graph> {
    let strategy = SaveStrategy::select(graph, url);
    debug!("Saving graph to {} using {:?}", url, strategy);
    let mut saved = resolve_local_nodes(graph, url);

    let (request, payload) = match strategy {
        SaveStrategy::PartialPatch => {
            let Some(log) = saved.change_log() else {
                unreachable!("patch strategy requires a change log");
            };
            if log.is_empty() {
                info!("No unsaved changes for {}", url);
                saved.begin_tracking();
                return Ok(saved);
            }
            let body = build_patch_body(log.deletions(), log.additions());
            let request = Request::patch(url)
                .header(CONTENT_TYPE, HeaderValue::from_static(SPARQL_UPDATE))
                .body(body);
            (request, render_changes(&saved))
        }
        SaveStrategy::FullReplace { create_only } => {
            let mut request = Request::put(url)
                .header(CONTENT_TYPE, HeaderValue::from_static(TURTLE))
                .body(encode_turtle(&saved));
            if create_only {
                request = request.header(IF_NONE_MATCH, HeaderValue::from_static("*"));
            }
            (request, render_graph(&saved))
        }
    };

    let response = fetcher.fetch(request)?;
    if !response.is_success() {
        return Err(failure_with_payload(
            "Storing the Resource at",
            url,
            response,
            &payload,
        ));
    }
    let resource = saved_resource_info(&response, url, graph.resource_info());
    saved.set_resource_info(resource);
    saved.begin_tracking();
    info!("Saved {} statements to {}", saved.len(), url);
    Ok(saved)
}

fn is_nss_container_rejection(response: &Response) -> bool {
    response.status == StatusCode::CONFLICT
        && response.text().trim() == NSS_CONTAINER_PUT_REJECTION
}

/// Creates an empty container at `url`, appending a trailing slash if it is missing.
///
/// Node Solid Server refuses to create containers with `PUT`; when it answers with its
/// exact rejection message, the container is created by writing and then deleting a
/// placeholder child inside it.
pub fn create_container_at(url: &str, fetcher: &dyn Fetcher) -> Result<Graph> {
    let url = if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    };
    let request = Request::put(&url)
        .header(CONTENT_TYPE, HeaderValue::from_static(TURTLE))
        .header(IF_NONE_MATCH, HeaderValue::from_static("*"))
        .header(LINK, container_type_link()?);
    let response = fetcher.fetch(request)?;
    if is_nss_container_rejection(&response) {
        warn!(
            "{} rejected creating a container with PUT, using a placeholder resource",
            url
        );
        return create_container_with_placeholder(&url, fetcher);
    }
    if !response.is_success() {
        return Err(failure("Creating the empty Container at", &url, response));
    }
    let mut container = Graph::new();
    container.set_resource_info(saved_resource_info(&response, &url, None));
    container.begin_tracking();
    info!("Created container {}", url);
    Ok(container)
}

fn create_container_with_placeholder(url: &str, fetcher: &dyn Fetcher) -> Result<Graph> {
    let existing = fetcher.fetch(Request::head(url))?;
    if existing.is_success() {
        let message = format!(
            "The Container at [{url}] already exists, and therefore cannot be created again."
        );
        return Err(anyhow!(FetchError::new(message, existing)));
    }

    let placeholder = format!("{url}{CONTAINER_PLACEHOLDER}");
    let created = fetcher.fetch(
        Request::put(&placeholder)
            .header(CONTENT_TYPE, HeaderValue::from_static(TURTLE))
            .body(Vec::new()),
    )?;
    if !created.is_success() {
        return Err(failure("Creating the empty Container at", url, created));
    }

    let deleted = fetcher.fetch(Request::delete(&placeholder))?;
    if !deleted.is_success() {
        return Err(failure(
            "Removing the placeholder Resource created for the Container at",
            url,
            deleted,
        ));
    }

    let described = fetcher.fetch(Request::head(url))?;
    if !described.is_success() {
        return Err(failure(
            "Reading the metadata of the newly created Container at",
            url,
            described,
        ));
    }
    let mut container = Graph::new();
    let mut resource = parse_response(&described, url);
    resource.url = url.to_string();
    container.set_resource_info(resource);
    container.begin_tracking();
    info!("Created container {} through a placeholder", url);
    Ok(container)
}

fn created_location(response: &Response, container_url: &str) -> Result<String> {
    let Some(location) = response.header(LOCATION.as_str()) else {
        return Err(anyhow!(MissingHeaderError {
            header: "Location".to_string(),
            url: container_url.to_string(),
        }));
    };
    Ok(Url::parse(container_url)?.join(location)?.to_string())
}

/// Posts `graph` into the container at `container_url`. The store picks the final location,
/// optionally guided by `slug`, and the returned graph is resolved against it.
pub fn save_graph_in_container(
    container_url: &str,
    graph: &Graph,
    slug: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<Graph> {
    // local nodes stay relative; the store resolves them against the new resource
    let mut outgoing = graph.clone();
    outgoing.separate_local_nodes(None);
    let request = Request::post(container_url)
        .header(CONTENT_TYPE, HeaderValue::from_static(TURTLE))
        .body(encode_turtle(&outgoing));
    let request = slug_header(request, slug)?;
    let response = fetcher.fetch(request)?;
    if !response.is_success() {
        return Err(failure_with_payload(
            "Storing the Resource in the Container at",
            container_url,
            response,
            &render_graph(&outgoing),
        ));
    }
    let location = created_location(&response, container_url)?;
    let mut saved = resolve_local_nodes(&outgoing, &location);
    saved.set_resource_info(saved_resource_info(&response, &location, None));
    saved.begin_tracking();
    info!("Saved {} statements to {}", saved.len(), location);
    Ok(saved)
}

/// Creates an empty container inside `container_url`, optionally named after `slug`.
pub fn create_container_in_container(
    container_url: &str,
    slug: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<Graph> {
    let request = Request::post(container_url)
        .header(CONTENT_TYPE, HeaderValue::from_static(TURTLE))
        .header(LINK, container_type_link()?);
    let request = slug_header(request, slug)?;
    let response = fetcher.fetch(request)?;
    if !response.is_success() {
        return Err(failure(
            "Creating an empty Container in the Container at",
            container_url,
            response,
        ));
    }
    let location = created_location(&response, container_url)?;
    let mut container = Graph::new();
    container.set_resource_info(saved_resource_info(&response, &location, None));
    container.begin_tracking();
    info!("Created container {}", location);
    Ok(container)
}

/// Deletes the resource at `url`.
pub fn delete_resource(url: &str, fetcher: &dyn Fetcher) -> Result<()> {
    let response = fetcher.fetch(Request::delete(url))?;
    if !response.is_success() {
        return Err(failure("Deleting the Resource at", url, response));
    }
    info!("Deleted {}", url);
    Ok(())
}

/// Deletes the container at `url`. Fails without contacting the store when `url` is not
/// container-shaped.
pub fn delete_container(url: &str, fetcher: &dyn Fetcher) -> Result<()> {
    if !is_container(url) {
        return Err(anyhow!(NotAContainerError {
            url: url.to_string()
        }));
    }
    let response = fetcher.fetch(Request::delete(url))?;
    if !response.is_success() {
        return Err(failure("Deleting the Container at", url, response));
    }
    info!("Deleted container {}", url);
    Ok(())
}

/// Deletes the resource `graph` was fetched from or last saved to.
pub fn delete_graph(graph: &Graph, fetcher: &dyn Fetcher) -> Result<()> {
    let Some(url) = graph.source_url() else {
        return Err(anyhow!(UnknownLocationError));
    };
    delete_resource(url, fetcher)
}
