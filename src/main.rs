use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use waves_ext::config::Config;
use waves_ext::extension::{LoaderState, ReloadOutcome};
use waves_ext::stamina::{AccountBaseInfo, DailyData, StaminaCard};
use waves_ext::ExtensionHost;

/// waves-ext - inspect, call and hot-reload Wuthering Waves formula extensions
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Override the extension directory
    #[arg(long)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load every extension module and list what it provides
    Status,
    /// Re-import every extension module
    Reload,
    /// Forward a call to an extension function
    Call {
        /// Module name: calculate or damage
        module: String,
        symbol: String,
        /// Arguments as JSON; anything that is not valid JSON is passed as a string
        args: Vec<String>,
    },
    /// Reload extension modules whenever their files change, until Ctrl-C
    Watch,
    /// Print the daily stamina card from API payloads
    Stamina {
        /// Daily note JSON
        daily: PathBuf,
        /// Account base info JSON
        account: PathBuf,
        /// Color the card with 24-bit ANSI sequences
        #[arg(long)]
        color: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        Config::load_from_file(config_path)?
    } else {
        Config::load_default()?
    };
    if let Some(root) = args.root {
        config.extension.root = root;
    }

    // Logging goes to stderr so command output stays machine-readable
    let filter = if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&config.logging.level))
            .context("Invalid log level")?
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set global default subscriber")?;

    let host = ExtensionHost::from_config(&config.extension);

    match args.command {
        Command::Status => print_status(&host),
        Command::Reload => {
            for (module, outcome) in host.reload_all() {
                print_outcome(module, &outcome);
            }
            Ok(())
        }
        Command::Call {
            module,
            symbol,
            args,
        } => call(&host, &module, &symbol, &args),
        Command::Watch => {
            for (module, outcome) in host.reload_all() {
                print_outcome(module, &outcome);
            }
            let period = Duration::from_millis(config.extension.watch_interval_ms.max(100));
            host.watch(period, async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!("Failed to listen for Ctrl-C: {}", e);
                }
            })
            .await;
            Ok(())
        }
        Command::Stamina {
            daily,
            account,
            color,
        } => stamina(&daily, &account, color),
    }
}

fn print_status(host: &ExtensionHost) -> Result<()> {
    for loader in host.loaders() {
        println!("{} ({})", loader.name(), loader.path().display());
        match loader.snapshot() {
            Ok(snapshot) => {
                println!(
                    "  generation {} from {} loaded at {}",
                    snapshot.generation(),
                    snapshot.source_path().display(),
                    snapshot.loaded_at().format("%Y-%m-%d %H:%M:%S UTC")
                );
                println!("  symbols: {}", snapshot.symbols().join(", "));
                if !snapshot.missing_slots().is_empty() {
                    println!("  missing: {}", snapshot.missing_slots().join(", "));
                }
            }
            Err(e) => println!("  unavailable: {e}"),
        }
    }
    Ok(())
}

fn print_outcome(module: &str, outcome: &ReloadOutcome) {
    match outcome {
        ReloadOutcome::Reloaded {
            generation,
            symbols,
            missing,
        } => {
            println!("{module}: generation {generation}, {symbols} symbols");
            if !missing.is_empty() {
                println!("  missing: {}", missing.join(", "));
            }
        }
        ReloadOutcome::Kept { error } => println!("{module}: kept previous registry ({error})"),
    }
}

fn call(host: &ExtensionHost, module: &str, symbol: &str, raw_args: &[String]) -> Result<()> {
    let Some(loader) = host.loader(module) else {
        bail!("Unknown extension module: {module}");
    };

    let snapshot = loader.snapshot()?;
    if !snapshot.contains(symbol) {
        bail!(
            "{module} does not export {symbol}; available: {}",
            snapshot.symbols().join(", ")
        );
    }

    let args: Vec<serde_json::Value> = raw_args
        .iter()
        .map(|raw| {
            serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.clone()))
        })
        .collect();

    let results = loader.call_json(symbol, &args)?;
    for result in results {
        println!("{}", serde_json::to_string(&result)?);
    }

    if let LoaderState::Loaded { generation } = loader.state() {
        tracing::debug!("Answered from {} generation {}", module, generation);
    }
    Ok(())
}

fn stamina(daily_path: &Path, account_path: &Path, color: bool) -> Result<()> {
    let daily: DailyData = read_json(daily_path)?;
    let account: AccountBaseInfo = read_json(account_path)?;

    let card = StaminaCard::build(&daily, &account, &chrono::Local::now());
    if color {
        println!("{card:#}");
    } else {
        println!("{card}");
    }
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}
