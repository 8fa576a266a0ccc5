//! ssainterp CLI

use clap::{Parser, Subcommand};
use ssainterp::json::{self, CliError};
use ssainterp::{BridgeConfig, DetachedFrame, Externals, driver};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ssainterp", version, about = "External function bridge for the SSA interpreter")]
struct Cli {
    /// Bridge configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log every dispatch
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered external functions
    List {
        /// Only show names starting with this prefix
        #[arg(long)]
        filter: Option<String>,
    },
    /// Call one external function with JSON-encoded arguments
    Call {
        /// Qualified name, e.g. `math.Abs` or `(reflect.Value).Kind`
        name: String,
        /// Arguments, one JSON document each
        args: Vec<String>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(cli.config.as_ref()).and_then(|config| match cli.command {
        Command::List { filter } => {
            list_externals(config, filter.as_deref());
            Ok(())
        }
        Command::Call { name, args } => call_external(config, &name, &args),
    });

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<BridgeConfig, CliError> {
    match path {
        Some(path) => Ok(BridgeConfig::load(path)?),
        None => Ok(BridgeConfig::default()),
    }
}

fn list_externals(config: BridgeConfig, filter: Option<&str>) {
    let externals = Externals::with_config(config);
    for name in externals.names() {
        if filter.is_none_or(|prefix| name.starts_with(prefix)) {
            println!("{name}");
        }
    }
}

fn call_external(config: BridgeConfig, name: &str, args: &[String]) -> Result<(), CliError> {
    let values = args
        .iter()
        .enumerate()
        .map(|(position, text)| json::parse_arg(position, text))
        .collect::<Result<Vec<_>, _>>()?;

    let externals = Externals::with_config(config);
    let code = driver::run(|| {
        let result = externals.dispatch(name, &mut DetachedFrame, &values)?;
        println!("{}", json::value_to_json(&result));
        Ok(result)
    });
    std::process::exit(code)
}
