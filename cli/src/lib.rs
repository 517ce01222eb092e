use anyhow::{anyhow, Error, Result};
use clap::{Parser, Subcommand};
use log::info;
use oxigraph::io::RdfFormat;
use podsync::codec::{decode, encode_turtle};
use podsync::config::Config;
use podsync::diagnostics::{render_changes, render_graph};
use podsync::http::{Fetcher, ReqwestFetcher};
use podsync::sync::{
    create_container_at, create_container_in_container, delete_container, delete_resource,
    get_graph, get_resource_info, save_graph_at, save_graph_in_container,
};
use podsync::Graph;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

#[derive(Debug, Parser)]
#[command(name = "podsync")]
#[command(about = "Read, edit and write RDF resources on Solid-style storage")]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Verbose mode - sets the RUST_LOG level to info, defaults to warning level
    #[clap(long, short, action, default_value = "false", global = true)]
    verbose: bool,
    /// Debug mode - sets the RUST_LOG level to debug, defaults to warning level
    #[clap(long, action, default_value = "false", global = true)]
    debug: bool,
    /// JSON file with client settings (timeout, user agent, redirects)
    #[clap(long, short, global = true)]
    config: Option<PathBuf>,
    /// Request timeout in seconds, overrides the configuration file
    #[clap(long, short, global = true)]
    timeout: Option<u64>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a resource and print its statements
    Get {
        /// Location of the resource
        url: String,
        /// Print Turtle instead of the readable listing
        #[clap(long, action)]
        turtle: bool,
    },
    /// Print the metadata of a resource as JSON
    Info {
        /// Location of the resource
        url: String,
    },
    /// Store the graph in a local file at a new location
    Put {
        /// Location to create
        url: String,
        /// Turtle, N-Triples or other RDF file; the format is taken from the extension
        file: PathBuf,
    },
    /// Store the graph in a local file inside a container
    Post {
        /// Location of the container
        container: String,
        /// Turtle, N-Triples or other RDF file; the format is taken from the extension
        file: PathBuf,
        /// Suggested name for the new resource
        #[clap(long)]
        slug: Option<String>,
    },
    /// Create an empty container
    Mkdir {
        /// Location of the container; a trailing slash is added if missing
        url: String,
    },
    /// Create an empty container inside another container
    MkdirIn {
        /// Location of the parent container
        container: String,
        /// Suggested name for the new container
        #[clap(long)]
        slug: Option<String>,
    },
    /// Fetch a resource, add and remove statements, and save the difference
    Edit {
        /// Location of the resource
        url: String,
        /// N-Triples file with statements to add
        #[clap(long)]
        add: Option<PathBuf>,
        /// N-Triples file with statements to remove
        #[clap(long)]
        remove: Option<PathBuf>,
    },
    /// Delete a resource
    Rm {
        /// Location of the resource
        url: String,
        /// Delete a container; the location must end with a slash
        #[clap(long, action)]
        container: bool,
    },
}

pub fn run() -> Result<()> {
    podsync::init_logging();
    let cmd = Cli::parse();
    execute(cmd)
}

pub fn run_from_args<I, T>(args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    podsync::init_logging();
    let cmd = Cli::try_parse_from(args).map_err(Error::from)?;
    execute(cmd)
}

fn execute(cmd: Cli) -> Result<()> {
    // RUST_LOG may already come from PODSYNC_LOG; the flags win, otherwise "warn"
    if cmd.debug {
        std::env::set_var("RUST_LOG", "debug");
    } else if cmd.verbose {
        std::env::set_var("RUST_LOG", "info");
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "warn");
    }
    let _ = env_logger::try_init();

    let mut config = match &cmd.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(timeout) = cmd.timeout {
        config.timeout_secs = timeout;
    }
    if cmd.verbose || cmd.debug {
        config.print();
    }
    let fetcher = ReqwestFetcher::new(&config)?;

    match cmd.command {
        Commands::Get { url, turtle } => {
            let graph = get_graph(&url, &fetcher)?;
            if turtle {
                print!("{}", encode_turtle(&graph));
            } else {
                print!("{}", render_graph(&graph));
            }
        }
        Commands::Info { url } => {
            let info = get_resource_info(&url, &fetcher)?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Commands::Put { url, file } => {
            let graph = read_graph(&file, &url)?;
            let saved = save_graph_at(&url, &graph, &fetcher)?;
            println!("Stored {} statements at {}", saved.len(), url);
        }
        Commands::Post {
            container,
            file,
            slug,
        } => {
            // relative references in the file resolve against the container
            let graph = read_graph(&file, &container)?;
            let saved = save_graph_in_container(&container, &graph, slug.as_deref(), &fetcher)?;
            println!("{}", saved.source_url().unwrap_or_default());
        }
        Commands::Mkdir { url } => {
            let created = create_container_at(&url, &fetcher)?;
            println!("{}", created.source_url().unwrap_or_default());
        }
        Commands::MkdirIn { container, slug } => {
            let created = create_container_in_container(&container, slug.as_deref(), &fetcher)?;
            println!("{}", created.source_url().unwrap_or_default());
        }
        Commands::Edit { url, add, remove } => {
            if add.is_none() && remove.is_none() {
                return Err(anyhow!("Nothing to edit: pass --add and/or --remove"));
            }
            let changes = edit_resource(&url, add.as_deref(), remove.as_deref(), &fetcher)?;
            print!("{}", changes);
        }
        Commands::Rm { url, container } => {
            if container {
                delete_container(&url, &fetcher)?;
            } else {
                delete_resource(&url, &fetcher)?;
            }
        }
    }
    Ok(())
}

/// Fetches `url`, removes then adds the statements in the given N-Triples files and saves
/// the difference. Returns the rendered changes.
fn edit_resource(
    url: &str,
    add: Option<&Path>,
    remove: Option<&Path>,
    fetcher: &dyn Fetcher,
) -> Result<String> {
    let mut graph = get_graph(url, fetcher)?;
    // redirects or normalisation may have moved the resource
    let location = graph.source_url().unwrap_or(url).to_string();
    if let Some(path) = remove {
        for statement in read_ntriples(path, &location)?.iter() {
            graph.remove(statement);
        }
    }
    if let Some(path) = add {
        for statement in read_ntriples(path, &location)?.iter() {
            graph.insert(statement.clone());
        }
    }
    let changes = render_changes(&graph);
    if graph.has_unsaved_changes() {
        save_graph_at(&location, &graph, fetcher)?;
        info!("Updated {}", location);
    }
    Ok(changes)
}

fn read_graph(path: &Path, base: &str) -> Result<Graph> {
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(RdfFormat::from_extension)
        .unwrap_or(RdfFormat::Turtle);
    let bytes = std::fs::read(path)?;
    decode(&bytes, format, base)
}

fn read_ntriples(path: &Path, base: &str) -> Result<Graph> {
    let bytes = std::fs::read(path)?;
    decode(&bytes, RdfFormat::NTriples, base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use podsync::http::{Request, Response};
    use reqwest::header::CONTENT_TYPE;
    use reqwest::{Method, StatusCode};
    use std::sync::Mutex;

    struct Replay {
        responses: Mutex<Vec<Response>>,
        requests: Mutex<Vec<Request>>,
    }

    impl Fetcher for Replay {
        fn fetch(&self, request: Request) -> Result<Response> {
            self.requests.lock().unwrap().push(request);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                return Err(anyhow!("no response left"));
            }
            Ok(responses.remove(0))
        }
    }

    #[test]
    fn test_edit_saves_to_fetched_location() {
        let dir = tempfile::tempdir().unwrap();
        let add = dir.path().join("add.nt");
        std::fs::write(
            &add,
            "<https://x/notes/doc> <http://purl.org/dc/terms/title> \"B\" .\n",
        )
        .unwrap();

        // the store redirected the read to the resource's final location
        let fetched = Response::new("https://x/notes/doc", StatusCode::OK)
            .with_header(CONTENT_TYPE, "text/turtle")
            .with_body("<https://x/notes/doc> <http://purl.org/dc/terms/title> \"A\" .");
        let fetcher = Replay {
            responses: Mutex::new(vec![
                fetched,
                Response::new("https://x/notes/doc", StatusCode::OK),
            ]),
            requests: Mutex::new(Vec::new()),
        };

        let changes = edit_resource("https://x/doc", Some(add.as_path()), None, &fetcher).unwrap();
        assert!(changes.contains("- Added: \"B\""));

        let requests = fetcher.requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].method, Method::PATCH);
        assert_eq!(requests[1].url, "https://x/notes/doc");
        assert!(requests[1].headers.get("if-none-match").is_none());
    }
}
