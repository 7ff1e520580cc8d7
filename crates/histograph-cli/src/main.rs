use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use histograph_client::wiki_source;
use histograph_core::{
    ExtractionReport, ExtractionRequest, ExtractionService, NodeKind, NodeRecord, NullSessions,
    PolitenessConfig, RunStatus, SequentialIds, TracingReporter, TraversalConfig,
    TraversalEngine, summarize,
};
use histograph_db::{CsvDataset, CsvNodeStore, Database, DatabaseConfig, export_records};

const DEFAULT_SEED: &str = "https://en.wikipedia.org/wiki/Korean_War";

#[derive(Parser)]
#[command(
    name = "histograph",
    version,
    about = "Builds an event/person knowledge graph from wiki infoboxes"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Output {
    /// PostgreSQL, with session history (requires DATABASE_URL)
    Sql,
    /// Append to a CSV file
    Csv,
    /// Write a JSON array
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Event,
    Person,
}

impl From<Kind> for NodeKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Event => NodeKind::Event,
            Kind::Person => NodeKind::Person,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl outward from a seed event page
    Extract {
        /// Seed page URL (treated as an event)
        #[arg(default_value = DEFAULT_SEED)]
        seed_url: String,

        /// Deepest degree to keep (the seed is degree 0)
        #[arg(short, long, default_value_t = 3)]
        max_degree: usize,

        /// Title for the seed node (defaults to the page heading)
        #[arg(long)]
        seed_title: Option<String>,

        /// Where discovered nodes are written
        #[arg(short, long, value_enum, default_value_t = Output::Json)]
        output: Output,

        /// Output file for csv (default nodes.csv) or json (default stdout)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Minimum pause between fetches, in milliseconds
        #[arg(long, default_value_t = 1000)]
        delay_ms: u64,

        /// Per-request timeout, in seconds
        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,

        /// Origin that linked names are resolved against
        #[arg(long, env = "HISTOGRAPH_BASE_URL", default_value = "https://en.wikipedia.org")]
        base_url: String,

        /// Session name for the sql output
        #[arg(long)]
        session_name: Option<String>,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// List recorded extraction sessions, newest first
    Sessions {
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// Per-degree node counts of one session
    Summary {
        #[arg(short, long)]
        session: Uuid,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// List nodes from a CSV file or from one recorded session
    Nodes {
        #[arg(long, conflicts_with = "session", required_unless_present = "session")]
        csv: Option<PathBuf>,

        #[arg(short, long)]
        session: Option<Uuid>,

        /// Only nodes at this degree (session only)
        #[arg(short, long, requires = "session")]
        degree: Option<usize>,

        #[arg(short, long, value_enum)]
        kind: Option<Kind>,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// Show one stored node as JSON
    Node {
        /// Node id (e.g. e1) or page URL
        #[arg(required_unless_present = "title")]
        key: Option<String>,

        /// Look up by title instead; pair with --parent for non-seed nodes
        #[arg(long, conflicts_with = "key")]
        title: Option<String>,

        #[arg(long, requires = "title")]
        parent: Option<String>,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },

    /// Append database nodes missing from a CSV file (matched by node id)
    Export {
        #[arg(long)]
        csv: PathBuf,

        #[arg(long, env = "DATABASE_URL", hide_env_values = true)]
        database_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("histograph=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            seed_url,
            max_degree,
            seed_title,
            output,
            out,
            delay_ms,
            timeout_secs,
            base_url,
            session_name,
            database_url,
        } => {
            let mut config = TraversalConfig::default()
                .with_base_url(base_url)
                .with_max_degree(max_degree)
                .with_politeness(PolitenessConfig::new(Duration::from_millis(delay_ms)));
            if let Some(title) = seed_title {
                config = config.with_seed_title(title);
            }
            let mut request = ExtractionRequest::new(seed_url);
            if let Some(name) = session_name {
                request = request.with_session_name(name);
            }
            cmd_extract(
                config,
                &request,
                output,
                out,
                Duration::from_secs(timeout_secs),
                database_url,
            )
            .await?;
        }
        Commands::Sessions {
            limit,
            database_url,
        } => {
            let db = connect_db(database_url).await?;
            cmd_sessions(&db, limit).await?;
        }
        Commands::Summary {
            session,
            database_url,
        } => {
            let db = connect_db(database_url).await?;
            cmd_summary(&db, session).await?;
        }
        Commands::Nodes {
            csv,
            session,
            degree,
            kind,
            database_url,
        } => {
            let kind = kind.map(Into::into);
            match (csv, session) {
                (Some(path), _) => cmd_nodes(path, kind).await?,
                (None, Some(session)) => {
                    let db = connect_db(database_url).await?;
                    cmd_session_nodes(&db, session, degree, kind).await?;
                }
                (None, None) => anyhow::bail!("Either --csv or --session is required"),
            }
        }
        Commands::Node {
            key,
            title,
            parent,
            database_url,
        } => {
            let db = connect_db(database_url).await?;
            cmd_node(&db, key, title, parent).await?;
        }
        Commands::Export { csv, database_url } => {
            let db = connect_db(database_url).await?;
            cmd_export(&db, csv).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL and apply pending migrations.
async fn connect_db(database_url: Option<String>) -> Result<Database> {
    let config = match database_url {
        Some(url) => DatabaseConfig::new(url),
        None => DatabaseConfig::from_env()?,
    };
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await?;
    Ok(db)
}

/// Cancel the returned token on Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl-C received, stopping after the current fetch");
            token.cancel();
        }
    });
    cancel
}

async fn cmd_extract(
    config: TraversalConfig,
    request: &ExtractionRequest,
    output: Output,
    out: Option<PathBuf>,
    timeout: Duration,
    database_url: Option<String>,
) -> Result<()> {
    let source = wiki_source(timeout).context("Failed to create HTTP client")?;
    let engine = TraversalEngine::new(source, config);
    let cancel = cancel_on_ctrl_c();

    let report = match output {
        Output::Sql => {
            let db = connect_db(database_url).await?;
            ExtractionService::new(engine, db.node_repo(), db.session_repo())
                .extract(request, &cancel, &TracingReporter)
                .await?
        }
        Output::Csv => {
            let path = out.clone().unwrap_or_else(|| PathBuf::from("nodes.csv"));
            tracing::info!(path = %path.display(), "Writing nodes to CSV");
            ExtractionService::new(engine, CsvNodeStore::new(path), NullSessions)
                .extract(request, &cancel, &TracingReporter)
                .await?
        }
        Output::Json => {
            ExtractionService::new(engine, SequentialIds::new(), NullSessions)
                .extract(request, &cancel, &TracingReporter)
                .await?
        }
    };

    let json_on_stdout = matches!(output, Output::Json) && out.is_none();
    if let Output::Json = output {
        let json = serde_json::to_string_pretty(&report.records)?;
        match &out {
            Some(path) => std::fs::write(path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?,
            None => println!("{json}"),
        }
    }

    let summary = render_summary(&report);
    if json_on_stdout {
        eprint!("{summary}");
    } else {
        print!("{summary}");
    }

    if let RunStatus::Failed(reason) = &report.status {
        anyhow::bail!("Extraction failed: {reason}");
    }
    Ok(())
}

fn render_summary(report: &ExtractionReport) -> String {
    let mut text = String::new();
    if !report.session_id.is_nil() {
        text.push_str(&format!("Session {}\n", report.session_id));
    }
    text.push_str(&format!(
        "Status: {} ({} nodes)\n",
        report.status,
        report.records.len()
    ));
    for level in summarize(&report.records) {
        text.push_str(&format!("\nDegree {}:\n", level.degree));
        text.push_str(&format!(
            "  Events ({}): {}\n",
            level.events.len(),
            level.events.join(", ")
        ));
        text.push_str(&format!(
            "  People ({}): {}\n",
            level.people.len(),
            level.people.join(", ")
        ));
    }
    text
}

async fn cmd_sessions(db: &Database, limit: usize) -> Result<()> {
    let sessions = db.session_repo().list(limit).await?;

    if sessions.is_empty() {
        println!("No extraction sessions found");
        return Ok(());
    }

    for session in &sessions {
        println!(
            "  {} [{}] {} nodes, started {} ({})",
            session.id,
            session.status,
            session.total_nodes,
            session.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            session.name,
        );
    }
    println!("\nTotal: {} sessions", sessions.len());

    Ok(())
}

async fn cmd_summary(db: &Database, id: Uuid) -> Result<()> {
    let summary = db
        .session_repo()
        .summary(id)
        .await?
        .with_context(|| format!("Session {id} not found"))?;

    let session = &summary.session;
    println!("{} ({})", session.name, session.id);
    println!("  Seed:       {}", session.seed_url);
    println!("  Max degree: {}", session.max_degree);
    println!("  Status:     {}", session.status);
    if let Some(error) = &session.error_message {
        println!("  Error:      {error}");
    }
    println!();
    for (degree, counts) in &summary.degree_counts {
        println!(
            "  Degree {degree}: {} events, {} people",
            counts.events, counts.people
        );
    }

    Ok(())
}

fn print_records(records: &[NodeRecord]) {
    for record in records {
        println!(
            "  {:<6} {:<6} {} {}",
            record.node_id,
            record.node_type.as_str(),
            record.degree,
            record.title
        );
    }
}

async fn cmd_nodes(path: PathBuf, kind: Option<NodeKind>) -> Result<()> {
    let dataset = CsvDataset::new(path);

    let records = match kind {
        Some(kind) => dataset.by_kind(kind).await?,
        None => dataset.load().await?.to_vec(),
    };
    print_records(&records);

    let counts = dataset.kind_counts().await?;
    println!(
        "\nTotal: {} events, {} people",
        counts.events, counts.people
    );

    Ok(())
}

async fn cmd_session_nodes(
    db: &Database,
    session: Uuid,
    degree: Option<usize>,
    kind: Option<NodeKind>,
) -> Result<()> {
    let repo = db.session_repo();
    let mut records = match degree {
        Some(degree) => repo.nodes_at_degree(session, degree).await?,
        None => repo.session_nodes(session).await?,
    };
    if let Some(kind) = kind {
        records.retain(|record| record.node_type == kind);
    }

    print_records(&records);
    println!("\nTotal: {} nodes", records.len());

    Ok(())
}

async fn cmd_node(
    db: &Database,
    key: Option<String>,
    title: Option<String>,
    parent: Option<String>,
) -> Result<()> {
    let repo = db.node_repo();
    let (record, label) = match (key, title) {
        (Some(key), _) if key.starts_with("http://") || key.starts_with("https://") => {
            (repo.find_by_url(&key).await?, key)
        }
        (Some(key), _) => (repo.find_by_node_id(&key).await?, key),
        (None, Some(title)) => (
            repo.find_by_title_parent(&title, parent.as_deref()).await?,
            title,
        ),
        (None, None) => anyhow::bail!("A node id, URL, or --title is required"),
    };

    let record = record.with_context(|| format!("Node {label} not found"))?;
    println!("{}", serde_json::to_string_pretty(&record)?);

    Ok(())
}

async fn cmd_export(db: &Database, path: PathBuf) -> Result<()> {
    let records = db.node_repo().all_nodes().await?;
    let total = records.len();

    let target = path.clone();
    let appended = tokio::task::spawn_blocking(move || export_records(&target, &records))
        .await
        .context("CSV export task failed")??;

    println!(
        "Appended {appended} of {total} nodes to {}",
        path.display()
    );

    Ok(())
}
