//! Command-line parsing and dispatch. Everything except `chat` and `say`
//! prints to stdout and exits without touching the terminal UI.

pub mod say;

use std::error::Error;

use clap::{Parser, Subcommand};

use crate::api::{ApiClient, DEFAULT_BASE_URL};
use crate::core::app::{App, LaunchOptions};
use crate::core::config::{path_display, Config, SETTABLE_KEYS};
use crate::ui::chat_loop::run_chat;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", ",
    env!("VERGEN_GIT_SHA"),
    ")\nbuilt ",
    env!("VERGEN_BUILD_TIMESTAMP"),
    " with rustc ",
    env!("VERGEN_RUSTC_SEMVER"),
);

#[derive(Parser)]
#[command(name = "chatbowl")]
#[command(version, long_version = LONG_VERSION)]
#[command(about = "A terminal chat client for a Chat Bowl inference backend")]
#[command(
    long_about = "Chatbowl is a full-screen terminal chat client for a Chat Bowl backend. \
It streams responses as they generate and keeps chat history, bookmarks, and \
generated images in local files.\n\n\
Controls:\n\
  Type              Compose your message in the input box\n\
  Enter             Send (Alt+Enter inserts a newline)\n\
  PageUp/Down/Mouse Scroll the conversation\n\
  Esc               Stop a streaming response, or clear the input\n\
  Ctrl+C            Quit\n\n\
Slash commands:\n\
  /help             List every command\n\
  /model <name>     Switch models (/models lists them)\n\
  /regen            Regenerate the last assistant reply\n\
  /save, /load      Manage saved chats"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to chat with, or list available models if no model is given
    #[arg(short = 'm', long, global = true, value_name = "MODEL", num_args = 0..=1, default_missing_value = "")]
    pub model: Option<String>,

    /// Provider to route through, or list providers if no provider is given
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER", num_args = 0..=1, default_missing_value = "")]
    pub provider: Option<String>,

    /// Backend base URL (default http://localhost:5050)
    #[arg(long, global = true, value_name = "URL")]
    pub base_url: Option<String>,

    /// Log the transcript to the given file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the chat interface (default)
    Chat,
    /// Ask one question and stream the answer to stdout
    Say {
        /// The prompt; multiple words are joined with spaces
        #[arg(trailing_var_arg = true)]
        prompt: Vec<String>,
    },
    /// List models installed on the backend
    Models,
    /// List inference providers the backend knows
    Providers,
    /// List personas the backend offers
    Personas,
    /// List prompt templates
    Templates,
    /// Check backend reachability
    Health,
    /// Set a configuration value
    Set {
        /// One of the settable keys (see error output for the list)
        key: String,
        /// Value to assign; multiple words are joined with spaces
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset a configuration value
    Unset { key: String },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load()?;
    let base_url = args
        .base_url
        .clone()
        .or_else(|| config.base_url.clone())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    // A bare -m or -p lists the choices and exits, like the subcommands do.
    let model = match args.model {
        Some(m) if m.is_empty() => return print_models(&base_url).await,
        other => other,
    };
    let provider = match args.provider {
        Some(p) if p.is_empty() => return print_providers(&base_url).await,
        other => other,
    };

    match args.command {
        None | Some(Commands::Chat) => {
            let options = LaunchOptions {
                model,
                provider,
                base_url: args.base_url,
                log_file: args.log,
            };
            let (app, rx) = App::new(config, options);
            run_chat(app, rx).await
        }
        Some(Commands::Say { prompt }) => {
            say::run_say(prompt.join(" "), model, provider, base_url, &config).await
        }
        Some(Commands::Models) => print_models(&base_url).await,
        Some(Commands::Providers) => print_providers(&base_url).await,
        Some(Commands::Personas) => print_personas(&base_url).await,
        Some(Commands::Templates) => print_templates(&base_url).await,
        Some(Commands::Health) => print_health(&base_url).await,
        Some(Commands::Set { key, value }) => set_config_value(config, &key, value),
        Some(Commands::Unset { key }) => unset_config_value(config, &key),
    }
}

async fn print_models(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(base_url);
    let models = client.models().await?;
    if models.is_empty() {
        println!("No models installed. Pull one with `ollama pull`.");
    } else {
        for model in models {
            println!("{model}");
        }
    }
    Ok(())
}

async fn print_providers(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(base_url);
    let response = client.providers().await?;
    if response.providers.is_empty() {
        println!("The backend reports no providers.");
        return Ok(());
    }
    for provider in &response.providers {
        let mut line = format!("{}  {}", provider.id, provider.name);
        if provider.needs_key {
            line.push_str(" (needs API key)");
        }
        if response.current.as_deref() == Some(provider.id.as_str()) {
            line.push_str(" [current]");
        }
        println!("{line}");
    }
    Ok(())
}

async fn print_personas(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(base_url);
    let response = client.personas().await?;
    if response.personas.is_empty() {
        println!("The backend reports no personas.");
        return Ok(());
    }
    for persona in &response.personas {
        match &persona.style {
            Some(style) => println!("{}  {} ({style})", persona.id, persona.name),
            None => println!("{}  {}", persona.id, persona.name),
        }
    }
    Ok(())
}

async fn print_templates(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(base_url);
    let response = client.templates().await?;
    if response.templates.is_empty() {
        println!("The backend reports no templates.");
        return Ok(());
    }
    for template in &response.templates {
        match &template.category {
            Some(category) => println!("{}  {} [{category}]", template.id, template.name),
            None => println!("{}  {}", template.id, template.name),
        }
    }
    Ok(())
}

async fn print_health(base_url: &str) -> Result<(), Box<dyn Error>> {
    let client = ApiClient::new(base_url);
    match client.health().await {
        Ok(health) => {
            println!("Backend: {} ({})", health.status, client.base_url());
            println!("Ollama: {}", if health.ollama { "running" } else { "not running" });
            if !health.providers.is_empty() {
                println!("Providers: {}", health.providers.join(", "));
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Backend not reachable at {}: {e}", client.base_url());
            std::process::exit(1);
        }
    }
}

fn set_config_value(
    mut config: Config,
    key: &str,
    value: Vec<String>,
) -> Result<(), Box<dyn Error>> {
    let value = value.join(" ");
    if value.is_empty() {
        eprintln!("Usage: chatbowl set <key> <value>");
        eprintln!("Settable keys: {}", SETTABLE_KEYS.join(", "));
        std::process::exit(2);
    }
    if let Err(e) = config.set_value(key, &value) {
        eprintln!("{e}");
        std::process::exit(2);
    }
    config.save()?;
    println!(
        "Set {key} = {value} in {}",
        path_display(Config::get_config_path())
    );
    Ok(())
}

fn unset_config_value(mut config: Config, key: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = config.unset_value(key) {
        eprintln!("{e}");
        std::process::exit(2);
    }
    config.save()?;
    println!(
        "Unset {key} in {}",
        path_display(Config::get_config_path())
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn arg_parser_is_well_formed() {
        Args::command().debug_assert();
    }

    #[test]
    fn bare_model_flag_parses_as_empty() {
        let args = Args::parse_from(["chatbowl", "-m"]);
        assert_eq!(args.model.as_deref(), Some(""));

        let args = Args::parse_from(["chatbowl", "-m", "llama3"]);
        assert_eq!(args.model.as_deref(), Some("llama3"));

        let args = Args::parse_from(["chatbowl"]);
        assert!(args.model.is_none());
    }

    #[test]
    fn say_collects_a_multi_word_prompt() {
        let args = Args::parse_from(["chatbowl", "say", "what", "is", "a", "monad"]);
        match args.command {
            Some(Commands::Say { prompt }) => {
                assert_eq!(prompt.join(" "), "what is a monad");
            }
            _ => panic!("expected say subcommand"),
        }
    }

    #[test]
    fn global_flags_apply_to_subcommands() {
        let args = Args::parse_from(["chatbowl", "say", "hi", "-m", "mistral", "--base-url", "http://x:1"]);
        assert_eq!(args.model.as_deref(), Some("mistral"));
        assert_eq!(args.base_url.as_deref(), Some("http://x:1"));
    }

    #[test]
    fn set_gathers_multi_word_values() {
        let args = Args::parse_from(["chatbowl", "set", "default-model", "llama3:70b"]);
        match args.command {
            Some(Commands::Set { key, value }) => {
                assert_eq!(key, "default-model");
                assert_eq!(value, vec!["llama3:70b"]);
            }
            _ => panic!("expected set subcommand"),
        }
    }
}
