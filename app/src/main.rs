//! Galleryze command line and interactive shell.

mod config;
mod import;
mod shell;

use api_client::{OfflineGateway, RemoteGateway, SupabaseClient};
use auth::{SessionManager, SessionStore};
use cache::{CacheManager, MemoryStore, PreferenceStore};
use clap::{Parser, Subcommand};
use classifier::{Classifier, DEFAULT_THRESHOLD};
use gallery::{Filter, GalleryController, Photo, SortState};
use std::path::PathBuf;
use std::sync::Arc;
use sync::Syncer;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "galleryze",
    author,
    version,
    about = "Galleryze photo gallery"
)]
struct Cli {
    /// Override log level (e.g. info, debug)
    #[arg(long)]
    log_level: Option<String>,
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Directory for the database, session file and logs
    #[arg(long)]
    data_path: Option<PathBuf>,
    /// Supabase project URL
    #[arg(long)]
    supabase_url: Option<String>,
    /// Supabase anon key
    #[arg(long)]
    supabase_key: Option<String>,
    /// Seconds before a backend call is abandoned
    #[arg(long)]
    gateway_timeout: Option<u64>,
    /// Enable tokio console for debugging
    #[arg(long)]
    debug_console: bool,
    /// Enable tracing spans instrumentation
    #[arg(long)]
    trace_spans: bool,
    /// Store the session in <data-path>/session.json instead of the system keyring
    #[arg(long)]
    session_file: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive shell (default)
    Shell,
    /// List visible photos
    List {
        /// all, favorites or a category name
        #[arg(long)]
        filter: Option<String>,
    },
    /// Toggle the favorite flag of a photo
    Favorite { id: String },
    /// Replace the categories of a photo
    Categorize {
        id: String,
        /// Category names; none clears the photo's categories
        categories: Vec<String>,
    },
    /// Create a category
    CreateCategory { name: String },
    /// Rename a category by id
    RenameCategory { id: String, name: String },
    /// Delete a category by id
    DeleteCategory { id: String },
    /// List categories
    Categories,
    /// Show details of a photo
    Show { id: String },
    /// Set the sort order
    Sort {
        /// date or size
        method: String,
        /// asc or desc
        direction: String,
    },
    /// Label an image file by name
    Classify {
        path: String,
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f32,
    },
    /// Register images from a directory in the photo catalog
    Import {
        dir: PathBuf,
        /// Assign the classifier bucket as a category
        #[arg(long)]
        classify: bool,
    },
    /// Create an account
    SignUp {
        email: String,
        password: String,
        display_name: String,
    },
    SignIn {
        email: String,
        password: String,
    },
    SignOut,
    /// Show backend, session and catalog status
    Status,
    /// Write the effective configuration to the config file
    SaveConfig,
}

/// Everything a command needs, wired from configuration.
pub struct Context {
    pub cfg: config::AppConfig,
    pub catalog: Option<CacheManager>,
    pub store: Arc<dyn PreferenceStore>,
    pub gateway: Arc<dyn RemoteGateway>,
    pub sessions: SessionManager,
}

impl Context {
    fn new(cfg: config::AppConfig) -> Self {
        let catalog = match CacheManager::new(&cfg.db_path()) {
            Ok(cache) => Some(cache),
            Err(e) => {
                tracing::warn!(error = %e, "Local database unavailable; running in memory only");
                None
            }
        };
        let store: Arc<dyn PreferenceStore> = match &catalog {
            Some(cache) => Arc::new(cache.clone()),
            None => Arc::new(MemoryStore::new()),
        };

        let gateway: Arc<dyn RemoteGateway> = match cfg.backend() {
            Some((url, key)) => match SupabaseClient::new(url, key.to_string()) {
                Ok(client) => Arc::new(client),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid backend configuration; working offline");
                    Arc::new(OfflineGateway)
                }
            },
            None => Arc::new(OfflineGateway),
        };

        let session_store = if cfg.session_file {
            SessionStore::File(cfg.session_path())
        } else {
            SessionStore::from_env()
        };
        let sessions = SessionManager::new(gateway.clone(), session_store).with_timeout(cfg.timeout());

        Self {
            cfg,
            catalog,
            store,
            gateway,
            sessions,
        }
    }

    pub fn syncer(&self) -> Syncer {
        Syncer::new(self.gateway.clone(), self.store.clone()).with_timeout(self.cfg.timeout())
    }

    fn photos(&self) -> Vec<Photo> {
        let Some(catalog) = &self.catalog else {
            return Vec::new();
        };
        match catalog.get_all_photos() {
            Ok(records) => records.into_iter().map(Photo::from).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read photo catalog");
                Vec::new()
            }
        }
    }

    /// Restore the session and load the gallery state.
    pub async fn controller(&mut self) -> GalleryController {
        let session = self.sessions.restore().await;
        let mut controller =
            GalleryController::new(self.photos(), self.syncer()).with_session(session);
        controller.load_initial_state().await;
        controller
    }
}

fn init_logging(cfg: &config::AppConfig) -> Result<WorkerGuard, Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&cfg.data_path)?;
    let file_appender = rolling::daily(&cfg.data_path, "galleryze.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    #[cfg(feature = "tokio-console")]
    if cfg.debug_console {
        console_subscriber::init();
        return Ok(guard);
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(cfg.log_level.clone()))
        .with_writer(std::io::stderr.and(file_writer))
        .init();
    Ok(guard)
}

pub fn print_photo(photo: &Photo) {
    let date = photo
        .captured_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "-".to_string());
    let cats = photo
        .categories
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(",");
    println!(
        "{} {:<24} {:>10} {:>10} {}",
        if photo.is_favorite() { "*" } else { " " },
        photo.id,
        date,
        photo.size_bytes.unwrap_or(0),
        cats
    );
}

pub fn print_categories(controller: &GalleryController) {
    for category in controller.categories() {
        println!("{} ({}, {})", category.name, category.id, category.color);
    }
}

#[cfg_attr(feature = "trace-spans", tracing::instrument)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let overrides = config::AppConfigOverrides {
        log_level: cli.log_level.clone(),
        supabase_url: cli.supabase_url.clone(),
        supabase_key: cli.supabase_key.clone(),
        gateway_timeout_secs: cli.gateway_timeout,
        data_path: cli.data_path.clone(),
        debug_console: cli.debug_console,
        trace_spans: cli.trace_spans,
        session_file: cli.session_file,
    };
    let config_path = cli.config.clone();
    let cfg = config::AppConfig::load_from(config_path.clone()).apply_overrides(&overrides);
    let _guard = init_logging(&cfg)?;
    let mut ctx = Context::new(cfg);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => {
            let controller = ctx.controller().await;
            shell::run(&mut ctx, controller).await?;
        }
        Commands::List { filter } => {
            let mut controller = ctx.controller().await;
            if let Some(filter) = filter {
                controller.set_filter(filter.parse::<Filter>()?);
            }
            let visible = controller.visible_photos();
            if visible.is_empty() {
                println!("No photos");
            }
            for photo in visible {
                print_photo(photo);
            }
        }
        Commands::Favorite { id } => {
            let mut controller = ctx.controller().await;
            match controller.toggle_favorite(&id).await {
                Some(state) if state.is_favorite() => println!("{} is a favorite", id),
                Some(_) => println!("{} is not a favorite", id),
                None => println!("Photo not found: {}", id),
            }
        }
        Commands::Categorize { id, categories } => {
            let mut controller = ctx.controller().await;
            match controller.set_categories(&id, &categories).await {
                Ok(_) => println!("Categories of {}: {}", id, controller.photo_details(&id)?.categories),
                Err(e) => println!("{}", e),
            }
        }
        Commands::CreateCategory { name } => {
            let mut controller = ctx.controller().await;
            match controller.create_category(&name).await {
                Ok(category) => println!("Category created: {} (id: {})", category.name, category.id),
                Err(e) => println!("{}", e),
            }
        }
        Commands::RenameCategory { id, name } => {
            let mut controller = ctx.controller().await;
            match controller.rename_category(&id, &name).await {
                Ok(()) => println!("Category renamed: {}", name.trim()),
                Err(e) => println!("{}", e),
            }
        }
        Commands::DeleteCategory { id } => {
            let mut controller = ctx.controller().await;
            match controller.delete_category(&id).await {
                Ok(category) => println!("Category deleted: {}", category.name),
                Err(e) => println!("{}", e),
            }
        }
        Commands::Categories => {
            let controller = ctx.controller().await;
            print_categories(&controller);
        }
        Commands::Show { id } => {
            let controller = ctx.controller().await;
            match controller.photo_details(&id) {
                Ok(details) => println!("{}", details),
                Err(e) => println!("{}", e),
            }
        }
        Commands::Sort { method, direction } => {
            let sort = SortState::new(method.parse()?, direction.parse()?);
            let mut controller = ctx.controller().await;
            controller.set_sort(sort);
            println!("Sorted by {}", sort);
        }
        Commands::Classify { path, threshold } => {
            let mut classifier = Classifier::new();
            classifier.load_models()?;
            let detections = classifier.detect_objects(&path)?;
            let class = classifier.classify_image(&path)?;
            let bucket = classifier.categorize(&path, threshold)?;
            classifier.close_models()?;
            println!("Detections: {}", serde_json::to_string(&detections)?);
            println!("Class: {}", serde_json::to_string(&class)?);
            println!("Bucket: {}", bucket);
        }
        Commands::Import { dir, classify } => {
            let Some(catalog) = ctx.catalog.clone() else {
                println!("No local database available; nothing imported");
                return Ok(());
            };
            let records = import::scan(&dir)?;
            for record in &records {
                catalog.insert_photo_async(record.clone()).await?;
            }
            println!("Imported {} photos", records.len());

            if classify {
                let dir_key = std::fs::canonicalize(&dir)
                    .unwrap_or_else(|_| dir.clone())
                    .display()
                    .to_string();
                let checkpoint_key = cache::keys::last_import_mtime(&dir_key);
                let stored = ctx.store.get(&checkpoint_key).unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "Cannot read import checkpoint");
                    None
                });
                let checkpoint = import::parse_checkpoint(stored.as_deref());
                let pending = import::unclassified(&records, checkpoint);
                let skipped = records.len() - pending.len();
                if skipped > 0 {
                    println!("Skipped {} already classified photos", skipped);
                }

                let classifier = Classifier::new();
                let mut controller = ctx.controller().await;
                for record in pending.iter().copied() {
                    let path = record.path.as_deref().unwrap_or(&record.id);
                    let bucket = classifier.categorize(path, DEFAULT_THRESHOLD)?;
                    let mut names: Vec<String> = controller
                        .photo(&record.id)
                        .map(|p| p.categories.iter().cloned().collect())
                        .unwrap_or_default();
                    names.push(bucket.to_string());
                    controller.set_categories(&record.id, &names).await?;
                    println!("{} -> {}", record.id, bucket);
                }
                if let Some(next) = import::advance_checkpoint(checkpoint, &pending) {
                    if let Err(e) = ctx.store.set(&checkpoint_key, &import::format_checkpoint(next)) {
                        tracing::warn!(error = %e, "Cannot save import checkpoint");
                    }
                }
            }
        }
        Commands::SignUp {
            email,
            password,
            display_name,
        } => {
            let signup = ctx.sessions.sign_up(&email, &password, &display_name).await?;
            if signup.session.is_some() {
                println!("Account created and signed in: {}", email);
            } else {
                println!("Account created; confirm your email, then sign in");
            }
        }
        Commands::SignIn { email, password } => {
            let session = ctx.sessions.sign_in(&email, &password).await?;
            println!("Signed in as {}", session.user.display_name().unwrap_or(&email));
        }
        Commands::SignOut => {
            ctx.sessions.restore().await;
            ctx.sessions.sign_out().await?;
            println!("Signed out");
        }
        Commands::SaveConfig => {
            ctx.cfg.save_to(config_path.clone())?;
            println!("Configuration saved");
        }
        Commands::Status => {
            let backend = ctx
                .cfg
                .supabase_url
                .clone()
                .unwrap_or_else(|| "offline".to_string());
            println!("Backend: {} ({})", backend, ctx.gateway.backend_tag());
            let controller = ctx.controller().await;
            match controller.session() {
                Some(session) => println!("Session: {}", session.user_id()),
                None => println!("Session: signed out"),
            }
            match &ctx.catalog {
                Some(_) => println!("Database: {}", ctx.cfg.db_path().display()),
                None => println!("Database: unavailable (in-memory mode)"),
            }
            println!("Photos: {}", controller.photos().len());
            println!("Sort: {}", controller.sort());
        }
    }

    Ok(())
}
