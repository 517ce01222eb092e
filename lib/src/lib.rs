//! Keeps in-memory RDF graphs in sync with resources on a Solid-style store.
//!
//! A [`Graph`] fetched with [`get_graph`] records every change made to it, so that
//! [`save_graph_at`] can send a minimal SPARQL update instead of the whole document.
//! All network traffic goes through a [`Fetcher`] supplied by the caller.

extern crate derive_builder;

pub mod changelog;
pub mod codec;
pub mod config;
pub mod consts;
pub mod diagnostics;
pub mod errors;
pub mod graph;
pub mod http;
pub mod metadata;
pub mod sync;
pub mod term;

pub use changelog::ChangeLog;
pub use config::Config;
pub use graph::{resolve_local_nodes, Graph};
pub use http::{Fetcher, ReqwestFetcher, Request, Response};
pub use metadata::{is_container, LinkRelation, ResourceInfo};
pub use sync::{
    create_container_at, create_container_in_container, delete_container, delete_graph,
    delete_resource, get_graph, get_resource_info, save_graph_at, save_graph_in_container,
    SaveStrategy,
};
pub use term::{LocalNode, Node, Statement, Value};

/// Lets `PODSYNC_LOG` stand in for `RUST_LOG`.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("PODSYNC_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
