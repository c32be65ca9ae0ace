//! UniDrive CLI - one command set for Google Drive, OneDrive and Dropbox.
//!
//! The access token comes from `--token` or the `UNIDRIVE_TOKEN`
//! environment variable. The provider comes from `--provider` or, when
//! omitted, from the stored selection (see `unidrive select`).

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use futures::StreamExt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

use unidrive_common::{Credential, Entity, ProviderId, ROOT_SENTINEL};
use unidrive_storage::{
    ClientRegistry, FilePreferenceStore, FsFile, PreferenceStore, StorageClient, StorageConfig,
    FOLDER_MIME_TYPE,
};

const TOKEN_ENV: &str = "UNIDRIVE_TOKEN";

#[derive(Parser)]
#[command(name = "unidrive")]
#[command(about = "UniDrive - Uniform access to cloud storage")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider to use: gdrive, onedrive or dropbox. Defaults to the stored selection.
    #[arg(short, long, global = true)]
    provider: Option<ProviderId>,

    /// Access token (falls back to $UNIDRIVE_TOKEN).
    #[arg(short, long, global = true)]
    token: Option<String>,

    /// Storage configuration file (JSON).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Preferences file (default: platform config dir).
    #[arg(long, global = true)]
    preferences: Option<PathBuf>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or change the selected provider.
    Select {
        /// Provider to select. Prints the current selection when omitted.
        provider: Option<ProviderId>,
    },

    /// List the children of a folder.
    #[command(alias = "ls")]
    List {
        /// Folder id (default: root).
        #[arg(default_value = ROOT_SENTINEL)]
        parent: String,
    },

    /// Search the whole account by name.
    Search {
        query: String,
    },

    /// Create an empty file.
    Create {
        name: String,

        /// Content type of the new file.
        #[arg(short, long, default_value = "application/octet-stream")]
        mime_type: String,

        /// Parent folder id.
        #[arg(long, default_value = ROOT_SENTINEL)]
        parent: String,
    },

    /// Create a folder.
    Mkdir {
        name: String,

        /// Parent folder id.
        #[arg(long, default_value = ROOT_SENTINEL)]
        parent: String,
    },

    /// Delete a file or folder.
    #[command(alias = "rm")]
    Delete {
        id: String,
    },

    /// Upload a local file.
    Upload {
        source: PathBuf,

        /// Parent folder id (default: root).
        #[arg(long)]
        parent: Option<String>,
    },

    /// Download a file.
    Download {
        id: String,

        /// Output path.
        #[arg(short, long)]
        output: PathBuf,

        /// Export/convert to this content type.
        #[arg(long)]
        export: Option<String>,
    },

    /// Replace the content of an existing file.
    Update {
        id: String,
        source: PathBuf,
    },

    /// List who has access to a file.
    Permissions {
        id: String,
    },

    /// List prior revisions of a file.
    Versions {
        id: String,
    },

    /// Generate shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match &cli.command {
        Commands::Completions { shell } => {
            write_completions(*shell, &mut io::stdout());
            Ok(())
        }
        Commands::Select { provider } => cmd_select(&preference_store(&cli)?, *provider).await,
        command => {
            let client = connect(&cli).await?;
            run(client.as_ref(), command, cli.json).await
        }
    }
}

fn write_completions(shell: Shell, out: &mut dyn io::Write) {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "unidrive", out);
}

/// Preferences file from `--preferences`, else the platform config dir.
fn preference_store(cli: &Cli) -> Result<FilePreferenceStore> {
    match &cli.preferences {
        Some(path) => Ok(FilePreferenceStore::new(path)),
        None => FilePreferenceStore::default_location()
            .context("No preferences location: pass --preferences"),
    }
}

/// Resolve provider and credential, then build a storage client.
async fn connect(cli: &Cli) -> Result<Arc<dyn StorageClient>> {
    let provider = match cli.provider {
        Some(provider) => provider,
        None => {
            let preferences = preference_store(cli)?;
            preferences
                .initialise()
                .await
                .context("Failed to initialise preferences")?;
            preferences.selected_provider().await?
        }
    };

    let token = match &cli.token {
        Some(token) => token.clone(),
        None => std::env::var(TOKEN_ENV)
            .with_context(|| format!("No access token: pass --token or set {}", TOKEN_ENV))?,
    };

    let config = match &cli.config {
        Some(path) => StorageConfig::load(path)
            .await
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => StorageConfig::default(),
    };

    debug!(%provider, "Connecting");
    let registry = ClientRegistry::new(config);
    let client = registry
        .connect(provider, &Credential::new(token))
        .await
        .with_context(|| format!("Failed to connect to {}", provider))?;
    Ok(client)
}

async fn run(client: &dyn StorageClient, command: &Commands, json: bool) -> Result<()> {
    match command {
        Commands::List { parent } => {
            let entities = client
                .list_files(parent)
                .await
                .context("Failed to list folder")?;
            print_entities(&entities, json)
        }

        Commands::Search { query } => {
            let entities = client.search(query).await.context("Search failed")?;
            print_entities(&entities, json)
        }

        Commands::Create {
            name,
            mime_type,
            parent,
        } => {
            let created = client
                .create_file(name, mime_type, parent)
                .await
                .context("Failed to create file")?;
            print_created(created, json)
        }

        Commands::Mkdir { name, parent } => {
            let created = client
                .create_file(name, FOLDER_MIME_TYPE, parent)
                .await
                .context("Failed to create folder")?;
            print_created(created, json)
        }

        Commands::Delete { id } => {
            let deleted = client.delete_file(id).await.context("Failed to delete")?;
            if json {
                println!("{}", serde_json::json!({ "id": id, "deleted": deleted }));
            } else if deleted {
                println!("Deleted: {}", id);
            } else {
                println!("Not found: {}", id);
            }
            Ok(())
        }

        Commands::Upload { source, parent } => {
            let file = FsFile::new(source).context("Invalid source file")?;
            info!("Uploading {}", source.display());
            let uploaded = client
                .upload_file(&file, parent.as_deref())
                .await
                .context("Upload failed")?;
            print_created(uploaded, json)
        }

        Commands::Download { id, output, export } => {
            cmd_download(client, id, output, export.as_deref()).await
        }

        Commands::Update { id, source } => {
            let file = FsFile::new(source).context("Invalid source file")?;
            let updated = client
                .update_file(&file, id)
                .await
                .context("Update failed")?;
            print_created(updated, json)
        }

        Commands::Permissions { id } => {
            let permissions = client
                .list_permissions(id)
                .await
                .context("Failed to list permissions")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&permissions)?);
            } else if permissions.is_empty() {
                println!("No permissions.");
            } else {
                for p in &permissions {
                    let who = p.display_name().or(p.email()).unwrap_or("-");
                    println!("  {:<10} {:<10} {} ({})", p.role(), p.scope(), who, p.id());
                }
            }
            Ok(())
        }

        Commands::Versions { id } => {
            let versions = client
                .list_versions(id)
                .await
                .context("Failed to list versions")?;
            if json {
                println!("{}", serde_json::to_string_pretty(&versions)?);
            } else if versions.is_empty() {
                println!("No versions.");
            } else {
                for v in &versions {
                    let when = v
                        .modified_at()
                        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    let size = v.size_bytes().map(|s| format!("{} bytes", s)).unwrap_or_default();
                    println!("  {}  {}  {}  {}", v.id(), when, v.author().unwrap_or("-"), size);
                }
            }
            Ok(())
        }

        Commands::Select { .. } | Commands::Completions { .. } => Ok(()),
    }
}

/// Show or store the selected provider.
async fn cmd_select(preferences: &FilePreferenceStore, provider: Option<ProviderId>) -> Result<()> {
    preferences
        .initialise()
        .await
        .context("Failed to initialise preferences")?;

    match provider {
        Some(provider) => {
            preferences
                .set_selected_provider(provider)
                .await
                .context("Failed to save selection")?;
            println!("Selected provider: {}", provider);
        }
        None => {
            let current = preferences.selected_provider().await?;
            println!("{} ({})", current, current.root_display_name());
        }
    }
    Ok(())
}

/// Stream a download into `output`.
async fn cmd_download(
    client: &dyn StorageClient,
    id: &str,
    output: &Path,
    export: Option<&str>,
) -> Result<()> {
    info!("Downloading {} to {}", id, output.display());

    let mut stream = client
        .download_file(id, export)
        .await
        .context("Failed to start download")?;
    let mut file = tokio::fs::File::create(output)
        .await
        .context("Failed to create output file")?;

    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("Download interrupted")?;
        file.write_all(&chunk)
            .await
            .context("Failed to write output file")?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    println!("Downloaded: {} ({} bytes)", output.display(), written);
    Ok(())
}

fn print_entities(entities: &[Entity], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(entities)?);
        return Ok(());
    }

    if entities.is_empty() {
        println!("Folder is empty.");
    }
    for entity in entities {
        match entity {
            Entity::Folder(folder) => println!("  [DIR]  {}/  {}", folder.name(), folder.id()),
            Entity::File(file) => {
                let size = file
                    .size_bytes()
                    .map(|s| format!(" ({} bytes)", s))
                    .unwrap_or_default();
                println!("  [FILE] {}{}  {}", file.name(), size, file.id());
            }
        }
    }
    Ok(())
}

fn print_created(entity: Option<Entity>, json: bool) -> Result<()> {
    match (entity, json) {
        (Some(entity), true) => println!("{}", serde_json::to_string_pretty(&entity)?),
        (Some(entity), false) => println!("Done: {} ({})", entity.name(), entity.id()),
        (None, true) => println!("null"),
        (None, false) => println!("Done. The provider returned no metadata."),
    }
    Ok(())
}
