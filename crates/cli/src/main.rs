use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tether_api::{CatalogQuery, Fixture, InProcApi, TetherApi};
use tether_catalog::{Acl, CatalogKind, DatabaseForm, Integration, ParticipantMode};
use tether_core::{Cluster, Filter, FilterSet, ResourceKind, ResourceSearchError, SearchResult};
use tether_search::{item_view, notices, ActionPickerStatus, ClusterNameResolver, SearchConfig, SearchSession};
use tokio::time::Instant;
use tracing::{info, warn};

mod render;

#[derive(Parser, Debug)]
#[command(name = "tetherctl", version, about = "Tether cross-cluster console CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Fixture describing clusters, resources and injected failures (YAML or JSON)
    #[arg(long = "fixture", env = "TETHER_FIXTURE", global = true)]
    fixture: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search resources across every connected cluster
    Search {
        /// Query string; whitespace separated terms
        query: String,
        /// Only search this cluster (name or URI)
        #[arg(long = "cluster")]
        cluster: Option<String>,
        /// Only search this resource type (servers, databases, kubes)
        #[arg(long = "kind")]
        kind: Option<String>,
        /// Limit resource results
        #[arg(long = "limit")]
        limit: Option<usize>,
    },
    /// List the filter actions available for an input
    Filters {
        #[arg(default_value = "")]
        input: String,
        #[arg(long = "cluster")]
        cluster: Option<String>,
        #[arg(long = "kind")]
        kind: Option<String>,
    },
    /// Browse the catalog of enrollable resources
    Catalog {
        #[arg(default_value = "")]
        search: String,
        /// Access rules file (YAML or JSON); everything is denied without one
        #[arg(long = "acl")]
        acl: Option<PathBuf>,
        /// Preselect a kind (server, database, kubernetes, desktop, application)
        #[arg(long = "kind")]
        kind: Option<String>,
    },
    /// Print join links for an active session
    Join {
        cluster: String,
        sid: String,
        /// Allowed participant modes (observer, moderator, peer)
        #[arg(required = true)]
        modes: Vec<String>,
    },
    /// Validate an integration create request
    Integration {
        file: PathBuf,
    },
    /// Check a database registration form against a cluster
    RegisterDb {
        /// Form file (YAML or JSON): engine, name, endpoint, port, labels
        file: PathBuf,
        /// Target cluster (name or URI)
        #[arg(long = "cluster")]
        cluster: String,
        /// Access rules file (YAML or JSON); everything is denied without one
        #[arg(long = "acl")]
        acl: Option<PathBuf>,
    },
}

fn init_tracing() {
    let env = std::env::var("TETHER_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("TETHER_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid TETHER_METRICS_ADDR; expected host:port");
        }
    }
}

fn load_api(fixture: Option<&Path>, config: SearchConfig) -> Result<InProcApi> {
    let path = fixture.ok_or_else(|| anyhow!("no fixture given; pass --fixture or set TETHER_FIXTURE"))?;
    let fixture = Fixture::load(path).with_context(|| format!("loading fixture {}", path.display()))?;
    Ok(InProcApi::new(fixture, config))
}

/// YAML parser also accepts JSON.
fn read_doc<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn read_acl(path: Option<&Path>) -> Result<Acl> {
    match path {
        Some(p) => read_doc(p),
        None => Ok(Acl::default()),
    }
}

fn find_cluster<'a>(clusters: &'a [Cluster], wanted: &str) -> Result<&'a Cluster> {
    clusters.iter().find(|x| x.name == wanted || x.uri.as_str() == wanted).ok_or_else(|| anyhow!("unknown cluster {:?}", wanted))
}

fn build_filters(clusters: &[Cluster], cluster: Option<&str>, kind: Option<&str>) -> Result<Vec<Filter>> {
    let mut out = Vec::new();
    if let Some(k) = kind {
        out.push(Filter::ResourceType(ResourceKind::from_str(k).map_err(|e| anyhow!(e))?));
    }
    if let Some(c) = cluster {
        out.push(Filter::Cluster(find_cluster(clusters, c)?.uri.clone()));
    }
    Ok(out)
}

fn print_items(actions: &[SearchResult], clusters: &[Cluster]) {
    let registry = clusters.to_vec();
    let names = ClusterNameResolver::new(&registry);
    for a in actions {
        for line in render::item_lines(&item_view(a, &names)) {
            println!("{}", line);
        }
    }
}

#[derive(Serialize)]
struct SearchOutput<'a> {
    status: &'a ActionPickerStatus,
    actions: &'a [SearchResult],
    errors: &'a [ResourceSearchError],
}

async fn search(cli: &Cli, query: &str, cluster: Option<&str>, kind: Option<&str>, limit: Option<usize>) -> Result<()> {
    let mut config = SearchConfig::from_env();
    if limit.is_some() {
        config.limit = limit;
    }
    let api = load_api(cli.fixture.as_deref(), config.clone())?;
    let clusters = api.clusters().await?;
    let now = Instant::now();

    let mut session = SearchSession::new(config.debounce);
    for f in build_filters(&clusters, cluster, kind)? {
        session.apply_filter(f, &clusters, now);
    }
    session.set_input(query, &clusters, now);
    if let Some(req) = session.flush() {
        let out = api.search(&req.query, &req.filters).await?;
        session.settle(req.generation, out);
    }
    let status = session.status(&clusters);
    let actions = session.actions();
    info!(query = %query, actions = actions.len(), "search settled");

    match cli.output {
        Output::Human => {
            let names = ClusterNameResolver::new(&clusters);
            let resolve = |u: &tether_core::ClusterUri| names.cluster_name(u.as_str());
            for n in notices(&status, &resolve) {
                for line in n.lines() {
                    println!("! {}", line);
                }
            }
            print_items(&actions, &clusters);
            for e in session.errors() {
                warn!(cluster = %e.cluster_uri, cause = %e.cause, "cluster search failed");
            }
        }
        Output::Json => {
            let out = SearchOutput { status: &status, actions: &actions, errors: session.errors() };
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();

    match &cli.command {
        Commands::Search { query, cluster, kind, limit } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "search");
            search(&cli, query, cluster.as_deref(), kind.as_deref(), *limit).await?;
        }
        Commands::Filters { input, cluster, kind } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "filters");
            let api = load_api(cli.fixture.as_deref(), SearchConfig::from_env())?;
            let clusters = api.clusters().await?;
            let filters: FilterSet = build_filters(&clusters, cluster.as_deref(), kind.as_deref())?.into_iter().collect();
            let actions = api.filter_actions(input, &filters).await?;
            match cli.output {
                Output::Human => {
                    if actions.is_empty() {
                        println!("(no filter actions left)");
                    }
                    print_items(&actions, &clusters);
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&actions)?),
            }
        }
        Commands::Catalog { search, acl, kind } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "catalog");
            let acl = read_acl(acl.as_deref())?;
            let kind = kind.as_deref().map(CatalogKind::from_str).transpose().map_err(|e| anyhow!(e))?;
            let api = InProcApi::new(Fixture::default(), SearchConfig::from_env());
            let specs = api.catalog(&acl, &CatalogQuery { search: search.clone(), kind }).await?;
            match cli.output {
                Output::Human => {
                    for s in &specs {
                        let access = if s.has_access { "" } else { "  (no access)" };
                        println!("{:<11} {}{}", s.kind, s.name, access);
                        if let Some(link) = &s.unguided_link {
                            println!("            {}", link);
                        }
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&specs)?),
            }
        }
        Commands::Join { cluster, sid, modes } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "join");
            let modes = modes.iter().map(|m| ParticipantMode::from_str(m)).collect::<Result<Vec<_>, _>>()?;
            let api = InProcApi::new(Fixture::default(), SearchConfig::default());
            let links = api.join_links(cluster, sid, &modes).await?;
            match cli.output {
                Output::Human => {
                    for l in &links {
                        println!("{:<15} {}", l.label, l.url);
                    }
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&links)?),
            }
        }
        Commands::Integration { file } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "integration");
            let ig: Integration = read_doc(file)?;
            let api = InProcApi::new(Fixture::default(), SearchConfig::default());
            match api.validate_integration(ig).await {
                Ok(ig) => match cli.output {
                    Output::Human => println!("ok: {} ({})", ig.name, ig.sub_kind),
                    Output::Json => println!("{}", serde_json::to_string_pretty(&ig)?),
                },
                Err(e) => bail!("invalid integration {}: {}", file.display(), e),
            }
        }
        Commands::RegisterDb { file, cluster, acl } => {
            metrics::counter!("cli_commands_total", 1u64, "command" => "register-db");
            let form: DatabaseForm = read_doc(file)?;
            let acl = read_acl(acl.as_deref())?;
            let api = load_api(cli.fixture.as_deref(), SearchConfig::default())?;
            let clusters = api.clusters().await?;
            let target = find_cluster(&clusters, cluster)?;
            match api.register_database(&target.uri, &acl, &form).await {
                Ok(req) => match cli.output {
                    Output::Human => println!("ok: {} {} ({})", req.name, req.uri, req.protocol),
                    Output::Json => println!("{}", serde_json::to_string_pretty(&req)?),
                },
                Err(e) => bail!("cannot register database from {}: {}", file.display(), e),
            }
        }
    }
    Ok(())
}
