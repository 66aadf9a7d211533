//! ollamachat - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use ollamachat::{
    cli::{logging, Args, Commands, Config},
    demo::Demo,
    models::format_gib,
    repl::ChatRepl,
    streaming::OllamaClient,
};
use std::io;
use tracing::debug;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.verbosity());

    let mut config = Config::load(args.config.clone()).context("Failed to load configuration")?;
    args.apply(&mut config);
    config.validate()?;
    debug!(?config, "effective configuration");

    match args.command() {
        Commands::Demo => run_demo(&config).await?,
        Commands::Chat => run_chat(&config).await?,
        Commands::Models => list_models(&config).await?,
        Commands::Config => show_config(&args, &config)?,
    }

    Ok(())
}

fn client(config: &Config) -> Result<OllamaClient> {
    Ok(OllamaClient::with_config(
        &config.ollama.base_url,
        config.client_timeouts(),
    )?)
}

/// Every step reports its own failure; the process still exits 0
async fn run_demo(config: &Config) -> Result<()> {
    let client = client(config)?;
    Demo::new(&client, &config.ollama.demo_model)
        .run(&mut io::stdout())
        .await?;
    Ok(())
}

async fn run_chat(config: &Config) -> Result<()> {
    let mut repl = ChatRepl::new(client(config)?, config)?;
    repl.run(env!("CARGO_PKG_VERSION")).await
}

async fn list_models(config: &Config) -> Result<()> {
    let client = client(config)?;

    println!("\nChecking Ollama models at {}...\n", client.base_url());

    match client.list_models().await {
        Ok(models) => {
            if models.is_empty() {
                println!("No models installed.");
                println!("\nPull a model with:");
                println!("  ollama pull {}", config.ollama.demo_model);
            } else {
                println!("Available models:");
                for model in models {
                    println!("  • {:<32} {}", model.name, format_gib(model.size));
                }
            }
            println!();
        }
        Err(e) => {
            eprintln!("{}", e.display_message().red());
            std::process::exit(1);
        }
    }

    Ok(())
}

fn show_config(args: &Args, config: &Config) -> Result<()> {
    println!("\n{}", "ollamachat Configuration".bold().cyan());
    println!("{}", "=".repeat(40).cyan());

    match (&args.config, Config::default_path()) {
        (Some(path), _) => println!("Source: {}", path.display()),
        (None, Some(path)) if path.exists() => println!("Source: {}", path.display()),
        _ => println!("Source: built-in defaults"),
    }
    println!("Verbosity: {}\n", args.verbosity().as_str());

    let rendered = toml::to_string_pretty(config).context("Failed to render configuration")?;
    println!("{}", rendered);
    Ok(())
}
