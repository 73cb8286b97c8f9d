//! noted: zero-knowledge notes with encrypted history
//!
//! Account commands:
//!   init --account <email>               - create account key material
//!   rekey --account <email>              - change the master password
//!
//! Note commands:
//!   create --account <email> --title T <file>    - new note, version 1
//!   push --account <email> <note-id> <file>      - record an edit
//!   list --account <email> [--tag T] [--deleted] - list notes (or tombstones)
//!   delete --account <email> <note-id>           - delete a note and its history
//!   log <note-id>                                - version history (no decryption)
//!   show --account <email> <note-id> [<version>] - reconstruct and print
//!   restore --account <email> <note-id> <version> - bring an old version back
//!
//!   config show                          - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use noted_core::config::{expand_tilde, NotedConfig};
use noted_core::{AccountKeys, NoteRecord, VersionRecord};
use noted_crypto::{check_password_strength, rekey_account, setup_account, KdfParams, VaultSession};
use noted_versions::{now_secs, JsonStore, NoteVault, Reconstruction, VersionStore};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "noted",
    version,
    about = "Zero-knowledge notes with encrypted version history",
    long_about = "noted: encrypted notes whose edits are kept as an encrypted chain of snapshots and deltas"
)]
struct Cli {
    /// Path to noted.toml configuration file
    #[arg(
        long,
        short = 'c',
        env = "NOTED_CONFIG",
        default_value = "~/.config/noted/noted.toml",
        global = true
    )]
    config: PathBuf,

    /// JSON store path (overrides config)
    #[arg(long, env = "NOTED_STORE", global = true)]
    store: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "NOTED_LOG", global = true)]
    log: Option<String>,

    /// Log format (json, text)
    #[arg(long, env = "NOTED_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create account key material protected by a new master password
    Init {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
    },

    /// Change the master password (the vault key and all notes are kept)
    Rekey {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
    },

    /// Create a note from a text file
    Create {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        #[arg(long, short = 't')]
        title: String,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// File holding the initial text
        file: PathBuf,
    },

    /// Record the contents of a file as the note's next version
    Push {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        note_id: String,
        file: PathBuf,
        /// New title (default: keep the current one)
        #[arg(long, short = 't')]
        title: Option<String>,
    },

    /// List an account's notes
    List {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        /// Only notes carrying this tag (case-insensitive)
        #[arg(long, conflicts_with = "deleted")]
        tag: Option<String>,
        /// List deleted notes instead, newest first
        #[arg(long)]
        deleted: bool,
    },

    /// Delete a note and its whole version history
    Delete {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        note_id: String,
    },

    /// Show a note's version history, newest first
    Log { note_id: String },

    /// Decrypt and print a note (latest version by default)
    Show {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        note_id: String,
        version: Option<u64>,
    },

    /// Write an older version back as a new snapshot
    Restore {
        #[arg(long, short = 'a', env = "NOTED_ACCOUNT")]
        account: String,
        note_id: String,
        version: u64,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the active configuration (merged defaults + config file)
    Show,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = expand_tilde(&cli.config);
    let config = NotedConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = match cli.log_format {
        Some(format) => format,
        None => LogFormat::from_str(&config.log.format, true)
            .map_err(|e| anyhow::anyhow!("invalid log format in config: {e}"))?,
    };
    init_logging(&level, format);

    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "noted starting"
    );

    let store_path = resolve_store_path(&config, cli.store.as_deref());

    match cli.command {
        Commands::Init { account } => cmd_init(&config, &store_path, &account).await,
        Commands::Rekey { account } => cmd_rekey(&config, &store_path, &account).await,
        Commands::Create {
            account,
            title,
            tags,
            file,
        } => cmd_create(&store_path, &account, &title, &tags, &file).await,
        Commands::Push {
            account,
            note_id,
            file,
            title,
        } => cmd_push(&store_path, &account, &note_id, &file, title.as_deref()).await,
        Commands::List {
            account,
            tag,
            deleted,
        } => {
            if deleted {
                cmd_list_deleted(&store_path, &account)
            } else {
                cmd_list(&store_path, &account, tag.as_deref())
            }
        }
        Commands::Delete { account, note_id } => cmd_delete(&store_path, &account, &note_id),
        Commands::Log { note_id } => cmd_log(&store_path, &note_id),
        Commands::Show {
            account,
            note_id,
            version,
        } => cmd_show(&store_path, &account, &note_id, version).await,
        Commands::Restore {
            account,
            note_id,
            version,
        } => cmd_restore(&store_path, &account, &note_id, version).await,
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Logs go to stderr so note text on stdout stays clean.
    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Resolve the store path: CLI flag > config
fn resolve_store_path(config: &NotedConfig, override_path: Option<&Path>) -> PathBuf {
    match override_path {
        Some(p) => expand_tilde(p),
        None => expand_tilde(&config.store.path),
    }
}

fn open_store(path: &Path) -> Result<JsonStore> {
    JsonStore::open(path).with_context(|| format!("opening store: {}", path.display()))
}

// ── Passwords ─────────────────────────────────────────────────────────────────

/// Master password from NOTED_MASTER_PASSWORD, or an interactive prompt.
fn read_password(env_var: &str, prompt: &str) -> Result<SecretString> {
    if let Ok(pw) = std::env::var(env_var) {
        return Ok(SecretString::from(pw));
    }
    let pw = rpassword::prompt_password(prompt).context("reading password")?;
    Ok(SecretString::from(pw))
}

/// A new password, confirmed when entered interactively.
fn read_new_password(env_var: &str) -> Result<SecretString> {
    if let Ok(pw) = std::env::var(env_var) {
        return Ok(SecretString::from(pw));
    }
    let first = SecretString::from(
        rpassword::prompt_password("New master password: ").context("reading password")?,
    );
    check_password_strength(&first)?;
    let second = SecretString::from(
        rpassword::prompt_password("Confirm master password: ").context("reading password")?,
    );
    if first.expose_secret() != second.expose_secret() {
        anyhow::bail!("passwords do not match");
    }
    Ok(first)
}

fn account_keys(store: &JsonStore, account: &str) -> Result<AccountKeys> {
    store
        .account(account)
        .cloned()
        .with_context(|| format!("no account {account} (run `noted init --account {account}`)"))
}

/// Unlock the vault off the async runtime; Argon2id is CPU-bound.
async fn unlock(store: &JsonStore, account: &str) -> Result<VaultSession> {
    let keys = account_keys(store, account)?;
    let password = read_password("NOTED_MASTER_PASSWORD", "Master password: ")?;
    let account = account.to_string();

    tokio::task::spawn_blocking(move || -> Result<VaultSession> {
        let mut session = VaultSession::new(account);
        session.unlock(&password, &keys)?;
        Ok(session)
    })
    .await
    .context("unlock task panicked")?
}

fn owned_note<'a>(store: &'a JsonStore, account: &str, note_id: &str) -> Result<&'a NoteRecord> {
    let note = store
        .note(note_id)
        .with_context(|| format!("no note {note_id}"))?;
    if !note.account_id.eq_ignore_ascii_case(account) {
        anyhow::bail!("note {note_id} does not belong to {account}");
    }
    Ok(note)
}

async fn read_text(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("reading {}", file.display()))
}

// ── `noted init` / `noted rekey` ──────────────────────────────────────────────

async fn cmd_init(config: &NotedConfig, store_path: &Path, account: &str) -> Result<()> {
    let mut store = open_store(store_path)?;
    if store.account(account).is_some() {
        anyhow::bail!("account {account} already initialised (use `noted rekey` to change the password)");
    }

    let password = read_new_password("NOTED_MASTER_PASSWORD")?;
    let params = KdfParams::from(&config.kdf);
    let account_id = account.to_string();

    let (keys, _vault_key) = tokio::task::spawn_blocking(move || {
        setup_account(&password, &account_id, &params)
    })
    .await
    .context("setup task panicked")??;

    store.put_account(account, keys);
    store.flush().context("saving account")?;

    println!("Initialised account {account}");
    println!("  store: {}", store_path.display());
    Ok(())
}

async fn cmd_rekey(config: &NotedConfig, store_path: &Path, account: &str) -> Result<()> {
    let mut store = open_store(store_path)?;
    let current = account_keys(&store, account)?;

    let old_password = read_password("NOTED_MASTER_PASSWORD", "Current master password: ")?;
    let new_password = read_new_password("NOTED_NEW_MASTER_PASSWORD")?;
    let params = KdfParams::from(&config.kdf);
    let account_id = account.to_string();

    let keys = tokio::task::spawn_blocking(move || {
        rekey_account(&old_password, &new_password, &account_id, &current, &params)
    })
    .await
    .context("rekey task panicked")??;

    store.put_account(account, keys);
    store.flush().context("saving account")?;

    println!("Master password changed for {account}");
    Ok(())
}

// ── `noted create` / `noted push` / `noted restore` ───────────────────────────

async fn cmd_create(
    store_path: &Path,
    account: &str,
    title: &str,
    tags: &[String],
    file: &Path,
) -> Result<()> {
    let text = read_text(file).await?;
    let mut store = open_store(store_path)?;
    let session = unlock(&store, account).await?;

    let note_id = uuid::Uuid::new_v4().to_string();
    let (vault, keys) = NoteVault::create(note_id.clone(), session.vault_key()?)?;
    store.insert_note(NoteRecord {
        id: note_id.clone(),
        account_id: account.to_lowercase(),
        title: title.to_string(),
        tags: tags.to_vec(),
        keys,
        created_at: now_secs(),
    })?;
    let v1 = vault.write_initial(&mut store, &text, title, tags)?;
    store.flush().context("saving note")?;

    println!("{note_id}");
    tracing::info!(note_id = %note_id, version = v1.version_number(), "note created");
    Ok(())
}

async fn cmd_push(
    store_path: &Path,
    account: &str,
    note_id: &str,
    file: &Path,
    title: Option<&str>,
) -> Result<()> {
    let text = read_text(file).await?;
    let mut store = open_store(store_path)?;
    let note = owned_note(&store, account, note_id)?.clone();
    let session = unlock(&store, account).await?;

    let vault = NoteVault::open(&note, session.vault_key()?)?;
    let title = title.unwrap_or(note.title.as_str());

    let recorded = push_text(&mut store, &vault, &note, &text, title)?;
    store.flush().context("saving note")?;

    match recorded {
        Some(version) => println!(
            "Recorded version {} ({})",
            version.version_number(),
            version.version_type
        ),
        None if title != note.title => println!("Renamed to {title:?}, text unchanged"),
        None => println!("no changes"),
    }
    Ok(())
}

/// Record `text` as the note's next version and apply a title change, which
/// is kept even when the text itself did not change.
fn push_text(
    store: &mut JsonStore,
    vault: &NoteVault,
    note: &NoteRecord,
    text: &str,
    title: &str,
) -> Result<Option<VersionRecord>> {
    let recorded = vault.commit_edit(store, text, title, &note.tags)?;
    if title != note.title {
        store.update_note_meta(&note.id, title, &note.tags)?;
    }
    Ok(recorded)
}

async fn cmd_restore(store_path: &Path, account: &str, note_id: &str, version: u64) -> Result<()> {
    let mut store = open_store(store_path)?;
    let note = owned_note(&store, account, note_id)?.clone();
    let session = unlock(&store, account).await?;

    let vault = NoteVault::open(&note, session.vault_key()?)?;
    let restored = vault
        .restore(&mut store, version)
        .with_context(|| format!("restoring version {version} of {note_id}"))?;
    store.flush().context("saving version")?;

    println!(
        "Restored version {version} as version {}",
        restored.version_number()
    );
    Ok(())
}

// ── `noted list` / `noted log` / `noted show` ─────────────────────────────────

fn cmd_list(store_path: &Path, account: &str, tag: Option<&str>) -> Result<()> {
    let store = open_store(store_path)?;
    let notes = match tag {
        Some(tag) => store.notes_tagged(account, tag),
        None => store.notes_for(account),
    };
    if notes.is_empty() {
        match tag {
            Some(tag) => println!("No notes for {account} tagged {tag:?}"),
            None => println!("No notes for {account}"),
        }
        return Ok(());
    }

    for note in notes {
        let latest = store
            .latest(&note.id)?
            .map(|v| v.version_number())
            .unwrap_or(0);
        let tags = if note.tags.is_empty() {
            String::new()
        } else {
            format!("  [{}]", note.tags.join(", "))
        };
        println!("{}  v{latest:<4} {}{tags}", note.id, note.title);
    }
    Ok(())
}

fn cmd_list_deleted(store_path: &Path, account: &str) -> Result<()> {
    let store = open_store(store_path)?;
    let deleted = store.deleted_for(account);
    if deleted.is_empty() {
        println!("No deleted notes for {account}");
        return Ok(());
    }

    println!("{:<36}  {:<12}  tags", "note", "deleted");
    for d in deleted {
        println!("{:<36}  {:<12}  {}", d.note_id, d.deleted_at, d.tags.join(", "));
    }
    Ok(())
}

fn cmd_log(store_path: &Path, note_id: &str) -> Result<()> {
    let store = open_store(store_path)?;
    let versions = store.list(note_id)?;
    if versions.is_empty() {
        anyhow::bail!("no versions for note {note_id}");
    }

    println!("{:<8} {:<9} {:<12} {:>8}  title", "version", "type", "created", "bytes");
    for v in versions {
        println!(
            "{:<8} {:<9} {:<12} {:>8}  {}",
            v.version_number(),
            v.version_type.to_string(),
            v.created_at,
            v.encrypted_content.len(),
            v.metadata.title
        );
    }
    Ok(())
}

async fn cmd_show(
    store_path: &Path,
    account: &str,
    note_id: &str,
    version: Option<u64>,
) -> Result<()> {
    let store = open_store(store_path)?;
    let note = owned_note(&store, account, note_id)?;
    let session = unlock(&store, account).await?;

    let vault = NoteVault::open(note, session.vault_key()?)?;
    let reconstruction = match version {
        Some(n) => vault.reconstruct_number(&store, n)?,
        None => vault.current(&store)?,
    };

    report_warnings(&reconstruction);
    print!("{}", reconstruction.content);
    Ok(())
}

fn report_warnings(reconstruction: &Reconstruction) {
    if reconstruction.is_authoritative() {
        return;
    }
    eprintln!("warning: PROVISIONAL CONTENT, history could not be fully replayed");
    for w in &reconstruction.warnings {
        eprintln!("  {w}");
    }
}

// ── `noted delete` ────────────────────────────────────────────────────────────

/// Deletion needs ownership but not the master password: nothing is decrypted.
fn cmd_delete(store_path: &Path, account: &str, note_id: &str) -> Result<()> {
    let mut store = open_store(store_path)?;
    owned_note(&store, account, note_id)?;

    let tombstone = store.delete_note(note_id)?;
    store.flush().context("saving store")?;

    println!("Deleted note {}", tombstone.note_id);
    Ok(())
}

// ── `noted config show` ───────────────────────────────────────────────────────

fn cmd_config_show(config: &NotedConfig, path: &Path) -> Result<()> {
    println!("# config: {}", path.display());
    let rendered = toml::to_string_pretty(config).context("serializing config")?;
    print!("{rendered}");
    Ok(())
}
