//! Command line front end: the settings page and a one-shot translator.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ollama_translator::config::{
    ConfigPatch, ConfigStore, FileConfigStore, TranslatorConfig, SUPPORTED_LANGUAGES,
};
use ollama_translator::controller::{MSG_NO_MODEL, MSG_NO_TEXT};
use ollama_translator::relay::{LocalRelay, RelayBackend, TranslatorBackend};
use ollama_translator::status::{format_size, ConnectionStatus, PopupState};

#[derive(Parser)]
#[command(name = "ollama-translator")]
#[command(about = "Translate text with a local Ollama model")]
#[command(version)]
pub(crate) struct Cli {
    /// Settings file (default: config.json next to the executable)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ollama host for this run, `host` or `host:port`
    #[arg(long, env = "OLLAMA_HOST")]
    pub host: Option<String>,

    /// Ollama port for this run
    #[arg(long, env = "OLLAMA_PORT")]
    pub port: Option<u16>,

    /// Model for this run
    #[arg(long, env = "OLLAMA_MODEL")]
    pub model: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check the Ollama connection and show the active settings
    Status,

    /// List installed models
    Models,

    /// Translate text into the write language
    Translate {
        /// Text to translate (default: the clipboard, on Windows)
        text: Option<String>,

        /// Translate into the read language instead
        #[arg(long)]
        read: bool,

        /// Put the result on the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// List supported language codes
    Languages,
}

#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Print the saved settings
    Show,

    /// Change saved settings
    Set {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,

        #[arg(long)]
        model: Option<String>,

        /// Language code selections are translated into, e.g. `es`
        #[arg(long)]
        read_language: Option<String>,

        /// Language code typed text is translated into, e.g. `en`
        #[arg(long)]
        write_language: Option<String>,
    },
}

/// Accepts the forms `OLLAMA_HOST` takes in the wild: `host`, `host:port`,
/// `http://host:port/`.
pub(crate) fn split_host(value: &str) -> (String, Option<u16>) {
    let bare = value
        .trim()
        .trim_start_matches("http://")
        .trim_start_matches("https://")
        .trim_end_matches('/');
    match bare.rsplit_once(':') {
        Some((host, port)) if !host.is_empty() && !host.ends_with(':') => match port.parse() {
            Ok(port) => (host.to_string(), Some(port)),
            Err(_) => (bare.to_string(), None),
        },
        _ => (bare.to_string(), None),
    }
}

impl Cli {
    fn store(&self) -> FileConfigStore {
        match &self.config {
            Some(path) => FileConfigStore::new(path.clone()),
            None => FileConfigStore::beside_exe(),
        }
    }

    /// Per-run overrides from flags and environment; never saved.
    pub(crate) fn overrides(&self) -> ConfigPatch {
        let mut patch = ConfigPatch {
            selected_model: self.model.clone(),
            ..ConfigPatch::default()
        };
        if let Some(host) = &self.host {
            let (host, port) = split_host(host);
            patch.ollama_host = Some(host);
            patch.ollama_port = port;
        }
        if self.port.is_some() {
            patch.ollama_port = self.port;
        }
        patch
    }

    async fn effective_config(&self) -> TranslatorConfig {
        let mut cfg = self.store().load().await;
        cfg.apply(&self.overrides());
        cfg
    }
}

pub(crate) async fn run(cli: Cli) -> Result<()> {
    let backend = RelayBackend::new(LocalRelay);
    match &cli.command {
        Commands::Status => status(&backend, &cli.effective_config().await).await,
        Commands::Models => models(&backend, &cli.effective_config().await).await,
        Commands::Translate { text, read, copy } => {
            let cfg = cli.effective_config().await;
            translate(&backend, &cfg, text.as_deref(), *read, *copy).await
        }
        Commands::Config { action } => config(&cli.store(), action).await,
        Commands::Languages => {
            for (code, name) in SUPPORTED_LANGUAGES {
                println!("{:<6} {}", code, name);
            }
            Ok(())
        }
    }
}

async fn status(backend: &impl TranslatorBackend, cfg: &TranslatorConfig) -> Result<()> {
    let mut state = PopupState::default();
    state.refresh(backend, cfg).await;

    println!("Status:  {}", state.status);
    println!("Server:  {}:{}", cfg.ollama_host, cfg.ollama_port);
    println!(
        "Model:   {}",
        if cfg.has_model() {
            cfg.selected_model.as_str()
        } else {
            "Not selected"
        }
    );
    println!("Read:    {}", cfg.read_language_name());
    println!("Write:   {}", cfg.write_language_name());
    for warning in state.warnings(cfg) {
        println!("! {}", warning);
    }
    Ok(())
}

async fn models(backend: &impl TranslatorBackend, cfg: &TranslatorConfig) -> Result<()> {
    let mut state = PopupState::default();
    state.refresh(backend, cfg).await;
    if state.status == ConnectionStatus::Disconnected {
        bail!("Ollama not running on {}:{}", cfg.ollama_host, cfg.ollama_port);
    }
    if state.models.is_empty() {
        println!("No models found. Pull one with `ollama pull <model>`.");
    }
    for m in &state.models {
        let mark = if m.name == cfg.selected_model { '*' } else { ' ' };
        println!("{} {} ({})", mark, m.name, format_size(m.size));
    }
    Ok(())
}

async fn translate(
    backend: &impl TranslatorBackend,
    cfg: &TranslatorConfig,
    text: Option<&str>,
    read: bool,
    copy: bool,
) -> Result<()> {
    let text = match text {
        Some(t) => t.to_string(),
        None => read_clipboard_string().context("no text given and the clipboard is unavailable")?,
    };
    if text.trim().is_empty() {
        bail!(MSG_NO_TEXT);
    }
    if !cfg.has_model() {
        bail!("{} (or pass --model)", MSG_NO_MODEL);
    }

    let language = if read {
        cfg.read_language_name()
    } else {
        cfg.write_language_name()
    };
    log::info!(
        "Translating {} chars with model {} to {}",
        text.len(),
        cfg.selected_model,
        language
    );
    let out = backend
        .translate(cfg, text.trim(), language)
        .await
        .context("translation failed, check that Ollama is running")?;
    println!("{}", out);

    if copy {
        if write_clipboard_string(&out) {
            log::info!("Translation copied to clipboard");
        } else {
            log::warn!("Failed to write clipboard");
        }
    }
    Ok(())
}

async fn config(store: &FileConfigStore, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let cfg = store.load().await;
            println!("# {}", store.path().display());
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::Set {
            host,
            port,
            model,
            read_language,
            write_language,
        } => {
            let patch = ConfigPatch {
                ollama_host: host.clone(),
                ollama_port: *port,
                selected_model: model.clone(),
                read_language: read_language.clone(),
                write_language: write_language.clone(),
            };
            if patch.is_empty() {
                bail!("nothing to set");
            }
            patch.validate()?;
            let cfg = store.save(&patch).await?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
    }
    Ok(())
}

fn read_clipboard_string() -> Option<String> {
    #[cfg(windows)]
    {
        clipboard_win::get_clipboard_string().ok()
    }
    #[cfg(not(windows))]
    {
        None
    }
}

fn write_clipboard_string(s: &str) -> bool {
    #[cfg(windows)]
    {
        clipboard_win::set_clipboard_string(s).is_ok()
    }
    #[cfg(not(windows))]
    {
        let _ = s;
        false
    }
}
