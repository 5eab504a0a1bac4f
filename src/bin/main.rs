use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use storecheck::{Params, Session, SuiteConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "storecheck")]
#[command(about = "Storefront UI checks over a polling element engine")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE", global = true)]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Quiet mode (only errors)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Validate a suite config and print a summary
    Check(ConfigArg),

    /// Print the locator table with config overrides applied
    Locators(ConfigArg),

    /// Launch the browser and resolve one locator on the store page
    Probe {
        #[command(flatten)]
        config: ConfigArg,

        /// Locator name, e.g. "cart icon"
        name: String,

        /// Run in headless mode (overrides config)
        #[arg(long)]
        headless: bool,
    },
}

#[derive(Args)]
struct ConfigArg {
    /// Suite config file
    config: PathBuf,
}

#[tokio::main]
async fn main() -> storecheck::Result<()> {
    let cli = Cli::parse();

    let level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            _ => Level::DEBUG,
        }
    };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    let params = Params::from_args(&cli.params)?.with_env();

    match cli.command {
        Command::Check(arg) => {
            let config = SuiteConfig::load_with_params(&arg.config, &params)?;
            let registry = config.registry()?;
            println!("Config valid: {}", config.name);
            println!("  Base URL: {}", config.base_url);
            println!("  Locators: {}", registry.len());
            if !config.locators.is_empty() {
                println!("  Overrides: {}", config.locators.len());
            }
            if let Some(ref creds) = config.credentials {
                println!("  Login: {}", creds.email);
            }
            if !config.params.is_empty() {
                println!("  Parameters: {}", config.params.len());
                for (name, def) in &config.params {
                    let req = if def.required { " (required)" } else { "" };
                    let secret = if def.secret { " (secret)" } else { "" };
                    let desc = def.description.as_deref().unwrap_or("");
                    println!("    - {}{}{}: {}", name, req, secret, desc);
                }
            }
            let t = &config.timeouts;
            println!(
                "  Timeouts: element {}ms, poll {}ms, page ready {}ms",
                t.element_ms, t.poll_ms, t.page_ready_ms
            );
        }

        Command::Locators(arg) => {
            let config = SuiteConfig::load_with_params(&arg.config, &params)?;
            let registry = config.registry()?;
            for locator in registry.iter() {
                let marker = if config.locators.contains_key(locator.name()) {
                    " (override)"
                } else {
                    ""
                };
                println!("{}{}", locator.name(), marker);
                for (i, strategy) in locator.strategies().iter().enumerate() {
                    println!("  {}. {}", i + 1, strategy);
                }
            }
        }

        Command::Probe {
            config,
            name,
            headless,
        } => {
            let mut suite = SuiteConfig::load_with_params(&config.config, &params)?;
            if headless {
                suite.browser.headless = true;
            }

            let locator = suite.locator(&name)?;
            let session = Session::launch(&suite).await?;
            let harness = session.harness();

            let found = match harness.find(&name).await {
                Ok(el) => {
                    println!("✓ {} (visible)", name);
                    println!(
                        "  Matched strategy {}: {}",
                        el.strategy_index + 1,
                        el.strategy
                    );
                    true
                }
                Err(e) => {
                    println!("✗ {}: {}", name, e);
                    for strategy in locator.strategies() {
                        println!("  tried {}", strategy);
                    }
                    if let Some(path) = session.capture_failure().await {
                        println!("  Screenshot: {}", path.display());
                    }
                    false
                }
            };
            session.close().await?;

            if !found {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
