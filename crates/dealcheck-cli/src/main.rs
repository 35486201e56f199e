use anyhow::Context;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use dealcheck_core::{Config, ProductDraft, ProductStore, WriteOutcome};
use dealcheck_store::{KeyValueStore, MemoryStore, SqliteStore};
use dealcheck_worker::{
    with_retry, FetchOutcome, HttpNetwork, Notification, Notifier, OfflineWorker, Request,
    RetryPolicy, SyncOutcome, WorkerConfig,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dealcheck")]
#[command(version, about = "Saved deals, price monitoring and an offline cache worker", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(long, global = true, env = "DEALCHECK_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite file for product collections, overrides the config
    #[arg(long, global = true, env = "DEALCHECK_DB")]
    db: Option<PathBuf>,

    /// Keep everything in memory, nothing touches disk
    #[arg(long, global = true)]
    ephemeral: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Bookmarked deals
    Saved {
        #[command(subcommand)]
        action: SavedAction,
    },
    /// Price-tracked deals
    Monitor {
        #[command(subcommand)]
        action: MonitorAction,
    },
    /// Free slots used across saved and monitored products
    Slots,
    /// Run the offline worker against an origin
    Worker(WorkerArgs),
    /// Show or write the config file
    Config {
        /// Write the effective config back to disk
        #[arg(long)]
        init: bool,
    },
}

#[derive(Subcommand)]
enum SavedAction {
    List,
    Add(ProductArgs),
    Remove { id: i64 },
    /// Exit status says whether the product is saved
    Check { id: i64 },
}

#[derive(Subcommand)]
enum MonitorAction {
    List,
    Add {
        #[command(flatten)]
        product: ProductArgs,
        /// Alert threshold
        #[arg(long)]
        target: Option<f64>,
    },
    Remove { id: i64 },
    /// Record a newly observed price
    Price { id: i64, price: f64 },
    /// Products at or under their target
    Targets,
    Check { id: i64 },
}

#[derive(Args)]
struct ProductArgs {
    #[arg(long)]
    id: i64,
    #[arg(long)]
    title: String,
    #[arg(long)]
    price: f64,
    #[arg(long)]
    original_price: Option<f64>,
    #[arg(long, default_value_t = 0.0)]
    discount: f64,
    #[arg(long, default_value = "/placeholder.svg")]
    image: String,
    #[arg(long, default_value = "Tech")]
    category: String,
    #[arg(long, default_value_t = 0.0)]
    ai_quality: f64,
}

impl From<ProductArgs> for ProductDraft {
    fn from(args: ProductArgs) -> Self {
        ProductDraft {
            id: args.id,
            title: args.title,
            current_price: args.price,
            original_price: args.original_price.unwrap_or(args.price),
            discount: args.discount,
            image: args.image,
            category: args.category,
            ai_quality: args.ai_quality,
        }
    }
}

#[derive(Args)]
struct WorkerArgs {
    /// Origin to serve, overrides the config
    #[arg(long)]
    origin: Option<String>,
    /// Same-origin GETs to push through the worker after activation
    #[arg(long = "fetch")]
    fetches: Vec<String>,
    /// Page loads to push through the worker (get the offline page on failure)
    #[arg(long = "document")]
    documents: Vec<String>,
    /// Simulate a push message with this text
    #[arg(long)]
    push: Option<String>,
    /// Fire a background sync event with this tag
    #[arg(long)]
    sync: Option<String>,
}

/// Prints notifications to stdout
struct ConsoleNotifier;

#[async_trait]
impl Notifier for ConsoleNotifier {
    async fn show(&self, notification: &Notification) -> dealcheck_worker::Result<()> {
        println!("🔔 {}: {}", notification.title, notification.body);
        for action in &notification.actions {
            println!("   [{}] {}", action.action, action.title);
        }
        Ok(())
    }

    async fn close(&self, _notification: &Notification) -> dealcheck_worker::Result<()> {
        Ok(())
    }

    async fn open_window(&self, url: &str) -> dealcheck_worker::Result<()> {
        println!("→ open {}", url);
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dealcheck=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(db) = &cli.db {
        config.storage.db_path = Some(db.clone());
    }

    match cli.command {
        Some(Commands::Saved { action }) => {
            let products = open_products(&config, cli.ephemeral)?;
            run_saved(&products, action)
        }
        Some(Commands::Monitor { action }) => {
            let products = open_products(&config, cli.ephemeral)?;
            run_monitor(&products, action)
        }
        Some(Commands::Slots) => {
            let products = open_products(&config, cli.ephemeral)?;
            let usage = products.slot_usage();
            println!(
                "{}/{} products saved/monitored ({} saved, {} monitored)",
                usage.total(),
                usage.limit,
                usage.saved,
                usage.monitored
            );
            if usage.nearly_full() {
                println!("Almost out of free slots");
            }
            Ok(())
        }
        Some(Commands::Worker(args)) => run_worker(&config, args).await,
        Some(Commands::Config { init }) => {
            if init {
                match &cli.config {
                    Some(path) => config.save_to(path)?,
                    None => config.save()?,
                }
                tracing::info!("Config written");
            }
            println!("{}", toml::to_string_pretty(&config).context("rendering config")?);
            Ok(())
        }
        None => {
            println!("No command specified. Try --help");
            Ok(())
        }
    }
}

fn open_products(config: &Config, ephemeral: bool) -> anyhow::Result<ProductStore> {
    let kv: Arc<dyn KeyValueStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        let path = config.storage.resolved_db_path()?;
        tracing::debug!("Using store at {}", path.display());
        Arc::new(
            SqliteStore::open(&path)
                .with_context(|| format!("opening store at {}", path.display()))?,
        )
    };

    Ok(ProductStore::new(kv).with_free_limit(config.storage.free_limit))
}

fn report(outcome: WriteOutcome, what: &str) {
    match outcome {
        WriteOutcome::Applied => println!("{}: done", what),
        WriteOutcome::Unchanged => println!("{}: nothing to change", what),
        WriteOutcome::Failed(reason) => println!("{}: failed ({})", what, reason),
    }
}

fn run_saved(products: &ProductStore, action: SavedAction) -> anyhow::Result<()> {
    match action {
        SavedAction::List => {
            let saved = products.saved_products();
            println!("{}", serde_json::to_string_pretty(&saved)?);
        }
        SavedAction::Add(args) => report(products.save_product(args.into()), "save"),
        SavedAction::Remove { id } => report(products.remove_saved_product(id), "remove"),
        SavedAction::Check { id } => {
            if !products.is_product_saved(id) {
                println!("{} is not saved", id);
                std::process::exit(1);
            }
            println!("{} is saved", id);
        }
    }
    Ok(())
}

fn run_monitor(products: &ProductStore, action: MonitorAction) -> anyhow::Result<()> {
    match action {
        MonitorAction::List => {
            for p in products.monitored_products() {
                let marker = if p.target_reached() { "🎯" } else { "  " };
                println!(
                    "{} #{} {} €{:.2} ({:+.2}) target {}",
                    marker,
                    p.id(),
                    p.product.title,
                    p.product.current_price,
                    p.price_change(),
                    p.target_price
                        .map(|t| format!("€{:.2}", t))
                        .unwrap_or_else(|| "-".to_string())
                );
            }
        }
        MonitorAction::Add { product, target } => {
            match monitor_within_limit(products, product.into(), target) {
                Some(outcome) => report(outcome, "monitor"),
                None => println!(
                    "monitor: free limit of {} products reached",
                    products.free_limit()
                ),
            }
        }
        MonitorAction::Remove { id } => report(products.remove_monitored_product(id), "remove"),
        MonitorAction::Price { id, price } => report(
            products.append_price_sample(id, price, chrono::Utc::now()),
            "price sample",
        ),
        MonitorAction::Targets => {
            let reached = products.targets_reached();
            println!("{}", serde_json::to_string_pretty(&reached)?);
        }
        MonitorAction::Check { id } => {
            if !products.is_product_monitored(id) {
                println!("{} is not monitored", id);
                std::process::exit(1);
            }
            println!("{} is monitored", id);
        }
    }
    Ok(())
}

/// Monitor a product unless the free tier is already full
///
/// Returns `None` when refused. Re-monitoring a product already tracked is let
/// through so the store can report it as unchanged.
fn monitor_within_limit(
    products: &ProductStore,
    draft: ProductDraft,
    target: Option<f64>,
) -> Option<WriteOutcome> {
    if products.slot_usage().monitoring_full() && !products.is_product_monitored(draft.id) {
        tracing::debug!("Free limit reached, not monitoring {}", draft.id);
        return None;
    }
    Some(products.monitor_product(draft, target))
}

async fn run_worker(config: &Config, args: WorkerArgs) -> anyhow::Result<()> {
    let settings = &config.worker;
    let origin = args.origin.as_deref().unwrap_or(&settings.origin);

    let mut worker_config = WorkerConfig::versioned(origin, &settings.cache_version)?;
    worker_config.static_assets = settings.static_assets.clone();
    worker_config.offline_page = settings.offline_page.clone();
    worker_config.sync_tag = settings.sync_tag.clone();

    let network = Arc::new(HttpNetwork::new()?);
    let mut worker =
        OfflineWorker::new(worker_config, network).with_notifier(Arc::new(ConsoleNotifier));

    // A failed install leaves nothing to serve with
    worker.install().await.context("installing offline worker")?;
    let evicted = worker.activate().await?;
    if !evicted.is_empty() {
        tracing::info!("Evicted {} old cache partitions", evicted.len());
    }

    let requests = args
        .fetches
        .iter()
        .map(|url| Request::get(url))
        .chain(args.documents.iter().map(|url| Request::document(url)))
        .collect::<dealcheck_worker::Result<Vec<_>>>()?;

    for request in &requests {
        match worker.handle_fetch(request).await {
            Ok(FetchOutcome::Passthrough) => println!("{} -> passthrough", request.url),
            Ok(FetchOutcome::Cached(r)) => println!("{} -> cache ({})", request.url, r.status),
            Ok(FetchOutcome::Network(r)) => println!("{} -> network ({})", request.url, r.status),
            Ok(FetchOutcome::Offline(_)) => println!("{} -> offline page", request.url),
            Err(e) => println!("{} -> error: {}", request.url, e),
        }
    }

    if let Some(text) = args.push.as_deref() {
        let notification = worker.handle_push(Some(text)).await?;
        worker
            .handle_notification_click(&notification, Some("view"))
            .await?;
    }

    if let Some(tag) = args.sync.as_deref() {
        // We're the host here, so retrying a failed sync is on us
        let outcome = with_retry(&RetryPolicy::default(), || async {
            match worker.handle_sync(tag).await {
                SyncOutcome::Failed(reason) => Err(reason),
                other => Ok(other),
            }
        })
        .await;
        match outcome {
            Ok(SyncOutcome::Ignored) => println!("sync {}: not a recognized tag", tag),
            Ok(_) => println!("sync {}: completed", tag),
            Err(reason) => println!("sync {}: gave up ({})", tag, reason),
        }
    }

    Ok(())
}
