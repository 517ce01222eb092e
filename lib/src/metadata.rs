//! Resource metadata parsed from store responses.
//!
//! [`parse_response`] turns a completed response into a [`ResourceInfo`]: the resource's
//! final location, whether it holds graph or raw data, its `Link` relations resolved to
//! absolute locations, the advisory `WAC-Allow` permission hints and `Last-Modified`.
//! Parsing never fails; anything missing or malformed is simply absent.

use crate::consts::{REL_ACCESS_CONTROL, REL_STORAGE_DESCRIPTION, WAC_ALLOW};
use crate::http::Response;
use chrono::prelude::*;
use lazy_static::lazy_static;
use oxigraph::io::RdfFormat;
use regex::Regex;
use reqwest::header::{HeaderMap, LAST_MODIFIED, LINK};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

lazy_static! {
    static ref WAC_ALLOW_ENTRY: Regex = Regex::new(r#"([A-Za-z]+)\s*=\s*"([^"]*)""#).unwrap();
}

/// Link relation names the engine knows about; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LinkRelation {
    /// Legacy access list (`rel="acl"`).
    Acl,
    /// Access control resource.
    AccessControl,
    Type,
    DescribedBy,
    StorageDescription,
    First,
    Last,
    Next,
    Prev,
    Other(String),
}

impl LinkRelation {
    pub fn parse(name: &str) -> Self {
        // registered relation types are case-insensitive, extension relations are IRIs
        match name.to_ascii_lowercase().as_str() {
            "acl" => return LinkRelation::Acl,
            "type" => return LinkRelation::Type,
            "describedby" => return LinkRelation::DescribedBy,
            "first" => return LinkRelation::First,
            "last" => return LinkRelation::Last,
            "next" => return LinkRelation::Next,
            "prev" | "previous" => return LinkRelation::Prev,
            _ => {}
        }
        match name {
            REL_ACCESS_CONTROL => LinkRelation::AccessControl,
            REL_STORAGE_DESCRIPTION => LinkRelation::StorageDescription,
            other => LinkRelation::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LinkRelation::Acl => "acl",
            LinkRelation::AccessControl => REL_ACCESS_CONTROL,
            LinkRelation::Type => "type",
            LinkRelation::DescribedBy => "describedby",
            LinkRelation::StorageDescription => REL_STORAGE_DESCRIPTION,
            LinkRelation::First => "first",
            LinkRelation::Last => "last",
            LinkRelation::Next => "next",
            LinkRelation::Prev => "prev",
            LinkRelation::Other(name) => name,
        }
    }
}

impl fmt::Display for LinkRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Absolute link targets grouped by relation, in header order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkedResources(BTreeMap<LinkRelation, Vec<String>>);

impl LinkedResources {
    pub fn get(&self, rel: &LinkRelation) -> &[String] {
        self.0.get(rel).map(|v| v.as_slice()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LinkRelation, &Vec<String>)> {
        self.0.iter()
    }

    fn push(&mut self, rel: LinkRelation, target: String) {
        let targets = self.0.entry(rel).or_default();
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
}

// relation names are the JSON keys
impl Serialize for LinkedResources {
    fn serialize<S>(&self, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let map: BTreeMap<&str, &Vec<String>> =
            self.0.iter().map(|(rel, v)| (rel.as_str(), v)).collect();
        map.serialize(s)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Access {
    pub read: bool,
    pub append: bool,
    pub write: bool,
    pub control: bool,
}

impl Access {
    fn from_modes(modes: &str) -> Self {
        let mut access = Access::default();
        for mode in modes.split_whitespace() {
            match mode.to_ascii_lowercase().as_str() {
                "read" => access.read = true,
                "append" => access.append = true,
                "write" => {
                    access.write = true;
                    access.append = true;
                }
                "control" => access.control = true,
                _ => {}
            }
        }
        access
    }
}

/// Advisory permission hints from the `WAC-Allow` header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub user: Access,
    pub public: Access,
}

/// Provenance attached to a graph that has been fetched from or stored at a location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceInfo {
    pub url: String,
    pub is_raw_data: bool,
    pub content_type: Option<String>,
    pub linked_resources: LinkedResources,
    pub permissions: Option<Permissions>,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ResourceInfo {
    /// Metadata for a graph resource that has only just been written to `url`.
    pub fn for_graph(url: &str) -> Self {
        ResourceInfo {
            url: url.to_string(),
            is_raw_data: false,
            content_type: Some(crate::consts::TURTLE.to_string()),
            linked_resources: LinkedResources::default(),
            permissions: None,
            last_modified: None,
        }
    }

    pub fn is_container(&self) -> bool {
        is_container(&self.url)
    }

    pub fn acl_url(&self) -> Option<&str> {
        self.linked_resources
            .get(&LinkRelation::Acl)
            .first()
            .map(|s| s.as_str())
    }

    pub fn access_control_url(&self) -> Option<&str> {
        self.linked_resources
            .get(&LinkRelation::AccessControl)
            .first()
            .map(|s| s.as_str())
    }

    /// Returns the RDF format the content type names, if any.
    pub fn rdf_format(&self) -> Option<RdfFormat> {
        self.content_type.as_deref().and_then(detect_format)
    }
}

/// Container locations end with a slash, ignoring any query or fragment.
pub fn is_container(url: &str) -> bool {
    let trimmed = url.split('#').next().unwrap_or(url);
    let path = trimmed.split('?').next().unwrap_or(trimmed);
    path.ends_with('/')
}

/// Attempts to identify an RDF serialization from the supplied media type.
pub(crate) fn detect_format(ct: &str) -> Option<RdfFormat> {
    let media_type = ct.split(';').next().unwrap_or(ct);
    RdfFormat::from_media_type(media_type.trim())
}

/// Parses a response into resource metadata. `request_url` is only used when the
/// response does not carry its own final location.
pub fn parse_response(response: &Response, request_url: &str) -> ResourceInfo {
    let url = if response.url.is_empty() {
        request_url.to_string()
    } else {
        response.url.clone()
    };
    let content_type = response.content_type().map(|s| s.to_string());
    let is_raw_data = content_type.as_deref().and_then(detect_format).is_none();
    let linked_resources = parse_link_headers(&response.headers, &url);
    let permissions = response.header(WAC_ALLOW).map(parse_wac_allow);
    let last_modified = parse_last_modified(response);
    ResourceInfo {
        url,
        is_raw_data,
        content_type,
        linked_resources,
        permissions,
        last_modified,
    }
}

pub(crate) fn parse_last_modified(response: &Response) -> Option<DateTime<Utc>> {
    response
        .header(LAST_MODIFIED.as_str())
        .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parses every `Link` header into relation -> absolute targets.
pub fn parse_link_headers(headers: &HeaderMap, base: &str) -> LinkedResources {
    let mut links = LinkedResources::default();
    let base = Url::parse(base).ok();
    for value in headers.get_all(LINK) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for (target, rels) in split_link_values(value) {
            let Some(resolved) = resolve_relative(base.as_ref(), &target) else {
                continue;
            };
            for rel in rels {
                links.push(LinkRelation::parse(&rel), resolved.clone());
            }
        }
    }
    links
}

/// Splits one `Link` header value into `(target, relation names)` pairs. Commas inside
/// `<...>` or quoted parameters do not separate links.
fn split_link_values(value: &str) -> Vec<(String, Vec<String>)> {
    let mut out = Vec::new();
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        let after = &rest[start + 1..];
        let Some(end) = after.find('>') else {
            break;
        };
        let target = after[..end].trim().to_string();
        let params_src = &after[end + 1..];
        // parameters run until the next comma outside quotes
        let mut in_quotes = false;
        let mut params_end = params_src.len();
        for (i, c) in params_src.char_indices() {
            match c {
                '"' => in_quotes = !in_quotes,
                ',' if !in_quotes => {
                    params_end = i;
                    break;
                }
                _ => {}
            }
        }
        let rels = parse_rel_param(&params_src[..params_end]);
        if !rels.is_empty() {
            out.push((target, rels));
        }
        rest = &params_src[params_end..];
    }
    out
}

fn parse_rel_param(params: &str) -> Vec<String> {
    for param in params.split(';') {
        let Some((key, value)) = param.split_once('=') else {
            continue;
        };
        if !key.trim().eq_ignore_ascii_case("rel") {
            continue;
        }
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        return value.split_whitespace().map(|s| s.to_string()).collect();
    }
    Vec::new()
}

fn resolve_relative(base: Option<&Url>, candidate: &str) -> Option<String> {
    if let Ok(absolute) = Url::parse(candidate) {
        return Some(absolute.to_string());
    }
    base?.join(candidate).ok().map(|u| u.to_string())
}

/// Parses a `WAC-Allow` header such as `user="read write", public="read"`.
/// Principals that are missing or malformed get no access.
pub fn parse_wac_allow(value: &str) -> Permissions {
    let mut permissions = Permissions::default();
    for caps in WAC_ALLOW_ENTRY.captures_iter(value) {
        let access = Access::from_modes(&caps[2]);
        match caps[1].to_ascii_lowercase().as_str() {
            "user" => permissions.user = access,
            "public" => permissions.public = access,
            _ => {}
        }
    }
    permissions
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;
    use reqwest::StatusCode;

    fn response(url: &str) -> Response {
        Response::new(url, StatusCode::OK)
    }

    #[test]
    fn test_final_location_wins() {
        let resp = response("https://x/redirected");
        let info = parse_response(&resp, "https://x/original");
        assert_eq!(info.url, "https://x/redirected");

        let resp = response("");
        let info = parse_response(&resp, "https://x/original");
        assert_eq!(info.url, "https://x/original");
    }

    #[test]
    fn test_raw_data_classification() {
        let info = parse_response(&response("https://x/doc"), "https://x/doc");
        assert!(info.is_raw_data);
        assert!(info.content_type.is_none());

        let resp = response("https://x/doc").with_header(CONTENT_TYPE, "text/turtle; charset=utf-8");
        let info = parse_response(&resp, "https://x/doc");
        assert!(!info.is_raw_data);
        assert_eq!(info.rdf_format(), Some(RdfFormat::Turtle));

        let resp = response("https://x/cat.png").with_header(CONTENT_TYPE, "image/png");
        assert!(parse_response(&resp, "https://x/cat.png").is_raw_data);
    }

    #[test]
    fn test_link_headers() {
        let resp = response("https://x/dir/doc")
            .with_header(LINK, "<doc.acl>; rel=\"acl\", <http://www.w3.org/ns/ldp#Resource>; rel=\"type\"")
            .with_header(LINK, "</acr?doc>; rel=\"http://www.w3.org/ns/solid/acp#accessControl\"")
            .with_header(LINK, "<https://x/meta,1>; rel=\"describedby next\"");
        let info = parse_response(&resp, "https://x/dir/doc");
        assert_eq!(info.acl_url(), Some("https://x/dir/doc.acl"));
        assert_eq!(info.access_control_url(), Some("https://x/acr?doc"));
        assert_eq!(
            info.linked_resources.get(&LinkRelation::Type),
            &["http://www.w3.org/ns/ldp#Resource".to_string()]
        );
        assert_eq!(
            info.linked_resources.get(&LinkRelation::DescribedBy),
            &["https://x/meta,1".to_string()]
        );
        assert_eq!(
            info.linked_resources.get(&LinkRelation::Next),
            &["https://x/meta,1".to_string()]
        );
    }

    #[test]
    fn test_link_relation_case() {
        assert_eq!(LinkRelation::parse("ACL"), LinkRelation::Acl);
        assert_eq!(LinkRelation::parse("previous"), LinkRelation::Prev);
        assert_eq!(
            LinkRelation::parse("https://example.org/Rel"),
            LinkRelation::Other("https://example.org/Rel".to_string())
        );
    }

    #[test]
    fn test_malformed_links_are_skipped() {
        let resp = response("https://x/doc")
            .with_header(LINK, "no brackets here; rel=\"acl\"")
            .with_header(LINK, "<https://x/other>");
        let info = parse_response(&resp, "https://x/doc");
        assert!(info.linked_resources.is_empty());
    }

    #[test]
    fn test_wac_allow() {
        let p = parse_wac_allow("user=\"read write\", public=\"read\"");
        assert!(p.user.read && p.user.write && p.user.append && !p.user.control);
        assert!(p.public.read && !p.public.write && !p.public.append);

        let p = parse_wac_allow("user=\"read append control\"");
        assert!(p.user.append && !p.user.write && p.user.control);
        assert_eq!(p.public, Access::default());
    }

    #[test]
    fn test_malformed_wac_allow_defaults_to_no_access() {
        let p = parse_wac_allow("user=read, public=\"read\"");
        assert_eq!(p.user, Access::default());
        assert!(p.public.read);

        let resp = response("https://x/doc").with_header(
            reqwest::header::HeaderName::from_static(WAC_ALLOW),
            "garbage",
        );
        let info = parse_response(&resp, "https://x/doc");
        assert_eq!(info.permissions, Some(Permissions::default()));
    }

    #[test]
    fn test_last_modified() {
        let resp = response("https://x/doc")
            .with_header(LAST_MODIFIED, "Wed, 21 Oct 2015 07:28:00 GMT");
        let info = parse_response(&resp, "https://x/doc");
        assert_eq!(
            info.last_modified,
            Some(Utc.with_ymd_and_hms(2015, 10, 21, 7, 28, 0).unwrap())
        );

        let resp = response("https://x/doc").with_header(LAST_MODIFIED, "yesterday");
        assert!(parse_response(&resp, "https://x/doc").last_modified.is_none());
    }

    #[test]
    fn test_is_container() {
        assert!(is_container("https://x/dir/"));
        assert!(is_container("https://x/dir/?page=2"));
        assert!(!is_container("https://x/doc"));
        assert!(!is_container("https://x/doc#/"));
    }
}
