//! kinfin - command-line front end for the KinFin analysis server

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use kinfin_client::api::{InitRequest, PageQuery};
use kinfin_client::client::ApiClient;
use kinfin_client::config::Config;
use kinfin_client::poll::{PollCoordinator, PollEvent, PollOutcome};
use kinfin_client::session::{Session, SessionStore, SharedStore};
use kinfin_client::validate::{parse_taxon_table, validate_config};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};

#[derive(Parser)]
#[command(name = "kinfin")]
#[command(about = "A client for the KinFin clustering-analysis server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Analysis-server URL (overrides the config file)
    #[arg(long)]
    server: Option<String>,

    /// Session id for session-scoped commands; falls back to the
    /// current session recorded in the config file
    #[arg(short, long)]
    session: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a taxon configuration and start a new analysis
    Submit {
        /// Taxon-definition table (tab- or comma-separated)
        config_file: PathBuf,

        /// Display name for the new session
        #[arg(long)]
        name: Option<String>,

        /// Clustering-dataset id to analyse against
        #[arg(long)]
        cluster: Option<String>,

        /// Submit with the advanced configuration flag set
        #[arg(long)]
        advanced: bool,

        /// Return immediately instead of watching the run
        #[arg(long)]
        no_watch: bool,
    },
    /// Poll a submitted run until it completes, fails, or times out
    Watch,
    /// One-shot status check for a session
    Status,
    /// List locally known sessions
    List,
    /// Refresh status and expiry for all known sessions in one call
    Refresh,
    /// Rename a session
    Rename { name: String },
    /// Delete a session from the local store
    Delete,
    /// Per-run summary
    Summary,
    /// Attributes and taxon sets available for this run
    Attributes,
    /// Cluster counts by taxon
    Counts,
    /// Paginated per-cluster summary for one attribute
    ClusterSummary {
        #[arg(default_value = "all")]
        attribute: String,
        #[command(flatten)]
        table: TableArgs,
    },
    /// Paginated per-attribute summary
    AttributeSummary {
        #[arg(default_value = "all")]
        attribute: String,
        #[command(flatten)]
        table: TableArgs,
    },
    /// Paginated cluster metrics for an attribute/taxon-set pair
    ClusterMetrics {
        attribute: String,
        #[arg(default_value = "all")]
        taxonset: String,
        #[command(flatten)]
        table: TableArgs,
    },
    /// Pairwise comparison for one attribute
    Pairwise { attribute: String },
    /// Download a plot image (e.g. rarefaction-curve, cluster-size-distribution)
    Plot {
        plot_type: String,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Look up taxon ids the server accepts in a configuration
    ProteomeIds {
        #[command(flatten)]
        page: PageArgs,
    },
    /// List clustering datasets available for submission
    ClusteringSets {
        #[command(flatten)]
        page: PageArgs,
    },
    /// Describe downloadable/table columns
    Columns {
        /// Only columns from this source file
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(long, default_value_t = 1)]
    page: u32,

    #[arg(long, default_value_t = 10)]
    page_size: u32,

    /// Column codes to include (repeatable)
    #[arg(long = "code")]
    codes: Vec<String>,
}

impl PageArgs {
    fn query(&self) -> PageQuery {
        PageQuery::new(self.page, self.page_size)
    }
}

#[derive(clap::Args)]
struct TableArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Download the whole table to a file instead of paging JSON
    #[arg(long, requires = "output")]
    as_file: bool,

    /// Where to write the downloaded table
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let session_flag = cli.session.clone();

    let mut config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(server) = &cli.server {
        config.server.url = server.clone();
    }

    let client = Arc::new(ApiClient::with_timeout(
        &config.server.url,
        Duration::from_secs(config.server.request_timeout_secs),
    )?);
    let store: SharedStore = Arc::new(Mutex::new(SessionStore::load(config.store_path())?));

    match cli.command {
        Commands::Submit {
            config_file,
            name,
            cluster,
            advanced,
            no_watch,
        } => {
            submit(
                &config_path,
                &mut config,
                &client,
                &store,
                config_file,
                name,
                cluster,
                advanced,
                no_watch,
            )
            .await
        }
        Commands::Watch => {
            let id = resolve_session(&session_flag, &config)?;
            watch(&config, Arc::clone(&client), &store, &id).await
        }
        Commands::Status => {
            let id = resolve_session(&session_flag, &config)?;
            let status = client.status(&id).await?;
            println!(
                "{id}: {}",
                if status.is_complete { "complete" } else { "running" }
            );
            Ok(())
        }
        Commands::List => {
            let store = store.lock().await;
            if store.is_empty() {
                println!("no sessions");
                return Ok(());
            }
            for session in store.list() {
                let expiry = session
                    .expiry_date
                    .map(|e| format!(", expires {}", e.format("%Y-%m-%d %H:%M")))
                    .unwrap_or_default();
                println!(
                    "{}  {}  [{:?}{expiry}]",
                    session.session_id, session.name, session.status
                );
            }
            Ok(())
        }
        Commands::Refresh => {
            let ids = store.lock().await.session_ids();
            if ids.is_empty() {
                println!("no sessions to refresh");
                return Ok(());
            }
            let entries = client.batch_status(&ids).await?;
            let mut store = store.lock().await;
            store.apply_batch_status(&entries);
            store.save()?;
            for entry in &entries {
                println!("{}: {}", entry.session_id, entry.status);
            }
            Ok(())
        }
        Commands::Rename { name } => {
            let id = resolve_session(&session_flag, &config)?;
            let mut store = store.lock().await;
            store.rename(&id, &name);
            store.save()?;
            Ok(())
        }
        Commands::Delete => {
            let id = resolve_session(&session_flag, &config)?;
            {
                let mut store = store.lock().await;
                store.delete(&id);
                store.save()?;
            }
            if config.preferences.current_session_id.as_deref() == Some(id.as_str()) {
                config.preferences.current_session_id = None;
                save_config(&config_path, &config)?;
            }
            Ok(())
        }
        Commands::Summary => {
            let id = resolve_session(&session_flag, &config)?;
            print_json(&client.run_summary(&id).await?.fields)
        }
        Commands::Attributes => {
            let id = resolve_session(&session_flag, &config)?;
            let available = client.available_attributes_taxonsets(&id).await?;
            println!("attributes: {}", available.attributes.join(", "));
            println!("taxon sets: {}", available.taxon_sets.join(", "));
            Ok(())
        }
        Commands::Counts => {
            let id = resolve_session(&session_flag, &config)?;
            print_json(&client.counts_by_taxon(&id).await?)
        }
        Commands::ClusterSummary { attribute, table } => {
            let id = resolve_session(&session_flag, &config)?;
            if table.as_file {
                let bytes = client
                    .cluster_summary_file(&id, &attribute, &table.page.codes)
                    .await?;
                write_download(table.output.as_deref(), &bytes)
            } else {
                let page = client
                    .cluster_summary(&id, &attribute, table.page.query(), &table.page.codes)
                    .await?;
                print_table(&page.entries, page.page, page.total_pages)
            }
        }
        Commands::AttributeSummary { attribute, table } => {
            let id = resolve_session(&session_flag, &config)?;
            if table.as_file {
                let bytes = client
                    .attribute_summary_file(&id, &attribute, &table.page.codes)
                    .await?;
                write_download(table.output.as_deref(), &bytes)
            } else {
                let page = client
                    .attribute_summary(&id, &attribute, table.page.query(), &table.page.codes)
                    .await?;
                print_table(&page.entries, page.page, page.total_pages)
            }
        }
        Commands::ClusterMetrics {
            attribute,
            taxonset,
            table,
        } => {
            let id = resolve_session(&session_flag, &config)?;
            if table.as_file {
                let bytes = client
                    .cluster_metrics_file(&id, &attribute, &taxonset, &table.page.codes)
                    .await?;
                write_download(table.output.as_deref(), &bytes)
            } else {
                let page = client
                    .cluster_metrics(&id, &attribute, &taxonset, table.page.query(), &table.page.codes)
                    .await?;
                print_table(&page.entries, page.page, page.total_pages)
            }
        }
        Commands::Pairwise { attribute } => {
            let id = resolve_session(&session_flag, &config)?;
            print_json(&client.pairwise_analysis(&id, &attribute).await?.fields)
        }
        Commands::Plot { plot_type, output } => {
            let id = resolve_session(&session_flag, &config)?;
            let bytes = client.plot(&id, &plot_type).await?;
            std::fs::write(&output, &bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("wrote {} ({} bytes)", output.display(), bytes.len());
            Ok(())
        }
        Commands::ProteomeIds { page } => {
            let table = client.valid_proteome_ids(page.query()).await?;
            for entry in &table.entries {
                match &entry.species {
                    Some(species) => println!("{}  {species}", entry.proteome_id),
                    None => println!("{}", entry.proteome_id),
                }
            }
            print_page_footer(table.page, table.total_pages);
            Ok(())
        }
        Commands::ClusteringSets { page } => {
            let table = client.clustering_sets(page.query()).await?;
            for set in &table.entries {
                let description = set.description.as_deref().unwrap_or("");
                println!("{}  {}  {description}", set.id, set.name);
            }
            print_page_footer(table.page, table.total_pages);
            Ok(())
        }
        Commands::Columns { file } => {
            for column in client.column_descriptions(file.as_deref()).await? {
                println!("{}: {}", column.column, column.description);
            }
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn submit(
    config_path: &Option<PathBuf>,
    config: &mut Config,
    client: &Arc<ApiClient>,
    store: &SharedStore,
    config_file: PathBuf,
    name: Option<String>,
    cluster: Option<String>,
    advanced: bool,
    no_watch: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(&config_file)
        .with_context(|| format!("failed to read {}", config_file.display()))?;
    let records = parse_taxon_table(&content)?;

    let report = validate_config(&records);
    if !report.is_ok() {
        eprintln!("configuration is invalid:");
        eprint!("{report}");
        bail!("submission blocked by {} validation issue(s)", report.issues.len());
    }

    let request = InitRequest {
        config: records.clone(),
        cluster_id: cluster.clone(),
        is_advanced: advanced,
    };
    let response = client.init(&request).await?;
    let session_id = response.session_id;
    tracing::info!(%session_id, "analysis submitted");

    let display_name = name.unwrap_or_else(|| {
        config_file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| session_id.clone())
    });
    let mut session = Session::new(&session_id, display_name, records);
    if let Some(cluster_id) = cluster {
        session = session.with_cluster(cluster_id.clone(), cluster_id);
    }
    {
        let mut store = store.lock().await;
        store.create(session);
        store.save()?;
    }

    config.preferences.current_session_id = Some(session_id.clone());
    save_config(config_path, config)?;
    println!("submitted: {session_id}");

    if no_watch {
        return Ok(());
    }
    watch(config, Arc::clone(client), store, &session_id).await
}

/// Run a polling loop in the foreground and report its outcome
async fn watch(
    config: &Config,
    client: Arc<ApiClient>,
    store: &SharedStore,
    session_id: &str,
) -> Result<()> {
    let (event_tx, mut event_rx) = mpsc::channel(8);
    let coordinator = PollCoordinator::new(
        client,
        Arc::clone(store),
        config.polling.to_poll_config(),
        event_tx,
    );

    println!("watching {session_id} ...");
    coordinator.watch(session_id).await;

    let event: PollEvent = event_rx
        .recv()
        .await
        .ok_or_else(|| anyhow!("polling loop ended without an outcome"))?;
    match event.outcome {
        PollOutcome::Complete => {
            println!("{}: analysis complete", event.session_id);
            store.lock().await.save()?;
            Ok(())
        }
        PollOutcome::Failed(message) => {
            store.lock().await.save()?;
            bail!("{}: analysis failed: {message}", event.session_id)
        }
        PollOutcome::TimedOut => {
            store.lock().await.save()?;
            bail!(
                "{}: timed out after {} status checks",
                event.session_id,
                config.polling.max_attempts
            )
        }
        PollOutcome::Cancelled => {
            bail!("{}: polling cancelled", event.session_id)
        }
    }
}

/// Resolve the session id for a session-scoped command: the explicit
/// `--session` flag wins, then the current session from the config file.
fn resolve_session(flag: &Option<String>, config: &Config) -> Result<String> {
    flag.clone()
        .or_else(|| config.preferences.current_session_id.clone())
        .ok_or_else(|| anyhow!("no session id: pass --session or submit an analysis first"))
}

fn save_config(path: &Option<PathBuf>, config: &Config) -> Result<()> {
    match path {
        Some(path) => config.save_to(path),
        None => config.save(),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn write_download(output: Option<&std::path::Path>, bytes: &[u8]) -> Result<()> {
    let output = output.ok_or_else(|| anyhow!("--as-file needs --output"))?;
    std::fs::write(output, bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

fn print_table(rows: &[kinfin_client::api::TableRow], page: u32, total_pages: u32) -> Result<()> {
    for row in rows {
        println!("{}", serde_json::to_string(row)?);
    }
    print_page_footer(page, total_pages);
    Ok(())
}

fn print_page_footer(page: u32, total_pages: u32) {
    if total_pages > 1 {
        println!("-- page {page} of {total_pages} --");
    }
}
