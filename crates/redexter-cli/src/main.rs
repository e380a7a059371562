//! redexter: decrypt rclone crypt files
//!
//! Commands:
//!   decrypt FILES...   - decrypt files with a password or a crypt remote's credentials
//!   remotes            - list crypt remotes in an rclone config
//!   reveal VALUE       - reveal an obscured rclone config value
//!   forget             - clear the remembered config path and cached password
//!   config show        - display current configuration

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use redexter_batch::{BatchEvent, BatchOutcome, DecryptionJob};
use redexter_core::config::{expand_tilde, RedexterConfig};
use redexter_core::RedexterError;
use redexter_crypto::{derive_data_key, SaltInput};
use redexter_secrets::{
    CredentialResolver, KeyringCache, LastConfigStore, RcloneCli, ResolvedRemotes,
};

// ── CLI structure ──────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "redexter",
    version,
    about = "Decrypt rclone crypt files",
    long_about = "redexter: decrypt files produced by rclone crypt remotes, \
                  with credentials typed in or read from an rclone config"
)]
struct Cli {
    /// Path to redexter config.toml
    #[arg(
        long,
        short = 'c',
        env = "REDEXTER_CONFIG",
        default_value = "~/.config/redexter/config.toml",
        global = true
    )]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long, env = "REDEXTER_LOG", global = true)]
    log: Option<String>,

    /// Log format (json, text); overrides the config file
    #[arg(long, env = "REDEXTER_LOG_FORMAT", global = true)]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Debug, ValueEnum, PartialEq)]
enum LogFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decrypt one or more crypt files
    ///
    /// Each output is written next to its input (or into --dest) with the
    /// final extension removed. Files are decrypted in order; the first
    /// failure stops the batch.
    Decrypt {
        /// Encrypted files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Destination directory (created if missing)
        #[arg(long, short = 'd')]
        dest: Option<PathBuf>,
        /// Crypt password (prompted if neither this nor --remote is given)
        #[arg(long, env = "REDEXTER_PASSWORD", hide_env_values = true)]
        password: Option<String>,
        /// Crypt salt (password2): hex, base64 or text; default salt if unset
        #[arg(long, env = "REDEXTER_SALT", hide_env_values = true)]
        salt: Option<String>,
        /// Take password and salt from this crypt remote
        #[arg(long, short = 'r')]
        remote: Option<String>,
        #[command(flatten)]
        rclone: RcloneArgs,
    },

    /// List crypt remotes in an rclone config
    Remotes {
        #[command(flatten)]
        rclone: RcloneArgs,
        /// Print revealed passwords and salts
        #[arg(long)]
        show_secrets: bool,
    },

    /// Reveal an obscured rclone config value
    Reveal {
        /// Obscured value, as stored in rclone.conf
        value: String,
    },

    /// Forget the remembered rclone config path and its cached password
    Forget,

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Args, Debug)]
struct RcloneArgs {
    /// rclone config file (default: config file setting, then the last one used)
    #[arg(long)]
    rclone_config: Option<PathBuf>,
    /// Password of an encrypted rclone config
    #[arg(long, env = "RCLONE_CONFIG_PASS", hide_env_values = true)]
    rclone_config_pass: Option<String>,
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
    let config = RedexterConfig::load(&config_path)
        .with_context(|| format!("loading config: {}", config_path.display()))?;

    let level = cli.log.clone().unwrap_or_else(|| config.log.level.clone());
    let format = cli.log_format.clone().unwrap_or(match config.log.format.as_str() {
        "json" => LogFormat::Json,
        _ => LogFormat::Text,
    });
    init_logging(&level, &format);

    match cli.command {
        Commands::Decrypt {
            files,
            dest,
            password,
            salt,
            remote,
            rclone,
        } => {
            cmd_decrypt(
                &config,
                files,
                dest,
                password.map(SecretString::from),
                salt,
                remote.as_deref(),
                &rclone,
            )
            .await
        }
        Commands::Remotes {
            rclone,
            show_secrets,
        } => cmd_remotes(&config, &rclone, show_secrets).await,
        Commands::Reveal { value } => cmd_reveal(&value),
        Commands::Forget => cmd_forget(&config),
        Commands::Config {
            action: ConfigAction::Show,
        } => cmd_config_show(&config, &config_path),
    }
}

fn init_logging(level: &str, format: &LogFormat) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // logs go to stderr so they never mix with command output
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

// ── Credential resolution ─────────────────────────────────────────────────────

fn build_resolver(config: &RedexterConfig) -> CredentialResolver<RcloneCli> {
    let resolver = CredentialResolver::new(RcloneCli::new(&config.rclone.binary));
    if !config.cache.enabled {
        return resolver;
    }
    resolver
        .with_cache(KeyringCache::new(&config.cache.keyring_service))
        .with_last_config(LastConfigStore::new(expand_tilde(&config.cache.state_file)))
}

/// Load crypt remotes, prompting for the config password once if the
/// config cannot be read without one.
async fn load_remotes(config: &RedexterConfig, args: &RcloneArgs) -> Result<ResolvedRemotes> {
    let resolver = build_resolver(config);
    let rclone_config = args
        .rclone_config
        .clone()
        .or_else(|| config.rclone.config_path.clone())
        .map(|p| expand_tilde(&p));
    let given = args.rclone_config_pass.clone().map(SecretString::from);
    let explicit_password = given.is_some();

    match resolver.resolve(rclone_config.as_deref(), given).await {
        Ok(resolved) => Ok(resolved),
        Err(e) if should_prompt_for_config_password(&e, explicit_password) => {
            tracing::debug!("config load failed without password: {e}");
            let pw = rpassword::prompt_password("rclone config password (blank if none): ")
                .context("reading config password")?;
            resolver
                .resolve(rclone_config.as_deref(), Some(SecretString::from(pw)))
                .await
                .context("loading rclone config")
        }
        Err(e) => Err(e).context("loading rclone config"),
    }
}

/// Only a config the tool actually read and refused is worth a password prompt.
fn should_prompt_for_config_password(err: &RedexterError, explicit_password: bool) -> bool {
    !explicit_password && matches!(err, RedexterError::ConfigRejected(_))
}

// ── `redexter decrypt` ────────────────────────────────────────────────────────

async fn cmd_decrypt(
    config: &RedexterConfig,
    files: Vec<PathBuf>,
    dest: Option<PathBuf>,
    password: Option<SecretString>,
    salt: Option<String>,
    remote: Option<&str>,
    rclone: &RcloneArgs,
) -> Result<()> {
    let (password, remote_salt) = match (remote, password) {
        (Some(name), None) => {
            let resolved = load_remotes(config, rclone).await?;
            let found = resolved.find(name).with_context(|| {
                format!(
                    "no crypt remote named '{name}' in {}",
                    resolved.config_path.display()
                )
            })?;
            (found.password.clone(), found.salt_input())
        }
        (_, Some(pw)) => (pw, None),
        (None, None) => {
            let pw = rpassword::prompt_password("Crypt password: ")
                .context("reading crypt password")?;
            (SecretString::from(pw), None)
        }
    };
    let salt = salt.map(SaltInput::Text).or(remote_salt);

    let min_length = config.crypto.min_password_length;
    let spinner = make_spinner("key");
    spinner.set_message("deriving key (scrypt)");
    let key = tokio::task::spawn_blocking(move || {
        derive_data_key(&password, salt.as_ref(), min_length)
    })
    .await
    .context("key derivation task")??;
    spinner.finish_and_clear();

    let dest = dest
        .or_else(|| config.output.dest_dir.clone())
        .map(|p| expand_tilde(&p));
    let total = files.len();
    let job = DecryptionJob::new(files, key, dest)?;
    let mut handle = redexter_batch::spawn(job, None).context("starting decryption worker")?;

    let pb = make_progress_bar(total as u64, "decrypt");
    let cancel = handle.cancel_token();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut interrupted = false;

    loop {
        tokio::select! {
            event = handle.events.recv() => match event {
                Some(BatchEvent::FileDone(summary)) => {
                    pb.println(format!("  {} -> {}", summary.input.display(), summary.output.display()));
                }
                Some(BatchEvent::Progress { completed, percent, .. }) => {
                    pb.set_position(completed as u64);
                    pb.set_message(format!("{percent}%"));
                }
                Some(BatchEvent::Finished(_)) | None => break,
            },
            _ = &mut ctrl_c, if !interrupted => {
                interrupted = true;
                pb.set_message("cancelling after current file");
                cancel.cancel();
            }
        }
    }

    let outcome = tokio::task::spawn_blocking(move || handle.join())
        .await
        .context("joining decryption worker")??;
    match outcome {
        BatchOutcome::Completed { files } => {
            pb.finish_with_message("done");
            println!("Decrypted {files} file(s).");
            Ok(())
        }
        BatchOutcome::Cancelled { completed } => {
            pb.abandon_with_message("cancelled");
            anyhow::bail!("cancelled after {completed} of {total} file(s)")
        }
        BatchOutcome::Failed { file, reason } => {
            pb.abandon_with_message("failed");
            anyhow::bail!("{}: {reason}", file.display())
        }
    }
}

// ── `redexter remotes` ────────────────────────────────────────────────────────

async fn cmd_remotes(config: &RedexterConfig, rclone: &RcloneArgs, show_secrets: bool) -> Result<()> {
    let resolved = load_remotes(config, rclone).await?;
    println!("# crypt remotes in {}", resolved.config_path.display());
    if resolved.remotes.is_empty() {
        println!("(none)");
    }
    for remote in &resolved.remotes {
        if show_secrets {
            let salt = remote
                .salt
                .as_ref()
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_else(|| "(default)".into());
            println!(
                "{}\tpassword={}\tsalt={}",
                remote.name,
                remote.password.expose_secret(),
                salt
            );
        } else {
            let salt = if remote.salt.is_some() { "custom salt" } else { "default salt" };
            println!("{}\t({salt})", remote.name);
        }
    }
    Ok(())
}

// ── `redexter reveal` / `forget` / `config show` ─────────────────────────────

fn cmd_reveal(value: &str) -> Result<()> {
    let plain = redexter_crypto::reveal(value.trim()).context("revealing value")?;
    println!("{plain}");
    Ok(())
}

fn cmd_forget(config: &RedexterConfig) -> Result<()> {
    build_resolver(config)
        .forget()
        .context("clearing saved rclone config")?;
    println!("Forgot saved rclone config path and password.");
    Ok(())
}

fn cmd_config_show(config: &RedexterConfig, config_path: &Path) -> Result<()> {
    if config_path.exists() {
        println!("# Configuration from: {}", config_path.display());
    } else {
        println!("# Configuration: defaults (no file at {})", config_path.display());
    }
    println!();
    let rendered = toml::to_string_pretty(config).context("serializing config to TOML")?;
    print!("{rendered}");
    Ok(())
}

// ── Progress bar helpers ──────────────────────────────────────────────────────

fn make_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

fn make_spinner(prefix: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{prefix:.bold} {spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_prefix(prefix.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}
