use std::rc::Rc;

use clap::{Parser, ValueEnum};
use colored::{control::set_override, Colorize};
use is_terminal::IsTerminal;
use tokio::task::LocalSet;
use tracing::debug;

use punchline::api::ApiClient;
use punchline::cli::args::{Cli, Commands, CompletionsArgs, OutputFormat};
use punchline::cli::commands;
use punchline::config::{Config, Paths};
use punchline::error::PunchlineError;
use punchline::store::ApiStore;
use punchline::telemetry;

fn main() {
    // Respect NO_COLOR (https://no-color.org/) and plain pipes
    if std::env::var("NO_COLOR").is_ok() || !std::io::stdout().is_terminal() {
        set_override(false);
    }

    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(e.exit_code());
    }
}

fn run() -> Result<(), PunchlineError> {
    let cli = Cli::parse();

    // Completions need no config or client
    if let Commands::Completions(CompletionsArgs { shell }) = &cli.command {
        Cli::print_completions(*shell);
        return Ok(());
    }

    let paths = Paths::new()?;
    let mut config = Config::load_from(&paths)?;
    telemetry::init(telemetry::resolve_level(cli.verbose, cli.quiet, &config.log.level))?;

    let format = match cli.output {
        Some(format) => format,
        None => OutputFormat::from_str(&config.output.format, true).unwrap_or_default(),
    };

    // Commands that don't talk to the API
    let output = match &cli.command {
        Commands::Config(args) => Some(commands::config(&mut config, &paths, args, format)?),
        Commands::Endpoints => Some(commands::endpoints(format)?),
        _ => None,
    };
    if let Some(output) = output {
        print_output(&output);
        return Ok(());
    }

    if let Some(url) = cli.api_url.clone() {
        config.set_base_url(url);
    }
    let client = ApiClient::new(&config)?;
    debug!(base_url = %client.base_url(), "using API");
    let store = ApiStore::with_catalog(Rc::new(client), config.cache.to_cache_config()?)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let local = LocalSet::new();
    let output = local.block_on(&runtime, dispatch(&store, &cli.command, format))?;

    print_output(&output);
    Ok(())
}

async fn dispatch(
    store: &ApiStore,
    command: &Commands,
    format: OutputFormat,
) -> Result<String, PunchlineError> {
    match command {
        Commands::Hosts => commands::hosts(store, format).await,
        Commands::Host { host_uid } => commands::host(store, host_uid, format).await,
        Commands::Venue {
            host_uid,
            venue_uid,
        } => commands::venue(store, host_uid, venue_uid, format).await,
        Commands::Room {
            host_uid,
            venue_uid,
            room_uid,
        } => commands::room(store, host_uid, venue_uid, room_uid, format).await,
        Commands::Events(args) => commands::events(store, args, format).await,
        Commands::Event { event_uid } => commands::event(store, event_uid, format).await,
        Commands::Artist { artist_uid } => commands::artist(store, artist_uid, format).await,
        Commands::Search(args) => commands::search(store, args, format).await,
        Commands::Location(args) => commands::location(store, args, format).await,
        Commands::Call(args) => commands::call(store, args, format).await,
        Commands::Open(args) => commands::open(store, args, format).await,
        Commands::Revise(args) => commands::revise(store, args, format).await,
        Commands::Config(_) | Commands::Endpoints | Commands::Completions(_) => unreachable!(),
    }
}

fn print_output(output: &str) {
    if !output.is_empty() {
        println!("{output}");
    }
}
