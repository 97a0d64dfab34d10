use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};

/// Browse and curate comedy show listings
#[derive(Parser)]
#[command(name = "punchline")]
#[command(version, propagate_version = true)]
#[command(about = "Browse and curate comedy show listings from the command line")]
pub struct Cli {
    /// Output format for command results [default: from config, else pretty]
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// API base URL (overrides api.base_url)
    #[arg(long, env = "PUNCHLINE_API_URL", global = true)]
    pub api_url: Option<String>,

    /// More diagnostics on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Write shell completions to stdout
    pub fn print_completions(shell: Shell) {
        let mut command = Self::command();
        let name = command.get_name().to_string();
        clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    }
}

/// Output format options
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, human-readable output
    #[default]
    Pretty,
    /// JSON output for scripting
    Json,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// List every host
    Hosts,

    /// Show a host with its venues and rooms
    Host {
        /// Host id
        host_uid: String,
    },

    /// Show a venue
    Venue {
        /// Host id
        host_uid: String,
        /// Venue id
        venue_uid: String,
    },

    /// Show a room
    Room {
        /// Host id
        host_uid: String,
        /// Venue id
        venue_uid: String,
        /// Room id
        room_uid: String,
    },

    /// List events, optionally filtered
    #[command(alias = "e")]
    Events(EventsArgs),

    /// Show an event and its lineup
    Event {
        /// Event id
        event_uid: String,
    },

    /// Show an artist
    Artist {
        /// Artist id
        artist_uid: String,
    },

    /// Search artists or venues
    #[command(alias = "s")]
    Search(SearchArgs),

    /// Look up places through the location proxy
    Location(LocationArgs),

    /// Call any endpoint by name
    Call(CallArgs),

    /// List every endpoint with its cache tags
    Endpoints,

    /// Resolve a web app link and show what that page shows
    Open(OpenArgs),

    /// Interactively curate event lineups
    Revise(ReviseArgs),

    /// Manage configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the events command
#[derive(Args)]
pub struct EventsArgs {
    /// Only events run by this host
    #[arg(long = "host")]
    pub host_uid: Option<String>,

    /// Only events at this venue
    #[arg(long = "venue")]
    pub venue_uid: Option<String>,

    /// Only events in this room
    #[arg(long = "room")]
    pub room_uid: Option<String>,

    /// Day to list: today, tomorrow, a weekday, or YYYY-MM-DD
    #[arg(short, long)]
    pub date: Option<String>,
}

/// What to search for
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchTarget {
    Artists,
    Venues,
}

impl SearchTarget {
    pub fn endpoint(self) -> &'static str {
        match self {
            Self::Artists => "searchArtists",
            Self::Venues => "searchVenues",
        }
    }
}

/// Arguments for the search command
#[derive(Args)]
pub struct SearchArgs {
    /// Index to search
    #[arg(value_enum)]
    pub target: SearchTarget,

    /// Search text
    pub query: String,
}

/// Arguments for the location command
#[derive(Args)]
pub struct LocationArgs {
    #[command(subcommand)]
    pub command: LocationCommands,
}

/// Location subcommands
#[derive(Subcommand)]
pub enum LocationCommands {
    /// Suggest places matching a partial name or address
    Autocomplete {
        /// Text typed so far
        text: String,
    },
    /// Address and coordinates of a place
    Details {
        /// Google place id
        place_id: String,
    },
    /// Boundary polygon of a place
    Polygon {
        /// Google place id
        place_id: String,
    },
}

/// Arguments for the call command
#[derive(Args)]
pub struct CallArgs {
    /// Endpoint name, e.g. findOneHost (see `punchline endpoints`)
    pub endpoint: String,

    /// Path parameter as key=value (repeatable)
    #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Query string parameter as key=value (repeatable)
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,

    /// JSON request body
    #[arg(short, long)]
    pub body: Option<String>,
}

/// Arguments for the open command
#[derive(Args)]
pub struct OpenArgs {
    /// Web app URL or path, e.g. /host/abc/venue/def
    pub url: String,
}

/// Arguments for the revise command
#[derive(Args)]
pub struct ReviseArgs {
    /// Start from this event instead of the next unrevised one
    #[arg(long = "event")]
    pub event_uid: Option<String>,
}

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

/// Config subcommands
#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., api.base_url)
        key: String,
        /// Value to set
        value: String,
    },
    /// Show configuration file path
    Path,
    /// Write a configuration file pointing at an API
    Init {
        /// API base URL
        base_url: String,
    },
}

/// Arguments for the completions command
#[derive(Args)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("invalid '{s}': expected KEY=VALUE")),
    }
}
