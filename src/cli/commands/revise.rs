//! Revise command - walk unrevised events and fix their lineups
//!
//! The session keeps two live queries: the next event awaiting revision and
//! the full event being edited. Lineup mutations invalidate the event, which
//! refetches before the prompt comes back.

use std::io::Write;
use std::str::FromStr;

use colored::Colorize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::api::types::Event;
use crate::api::Args;
use crate::cache::Tag;
use crate::cli::args::ReviseArgs;
use crate::cli::OutputFormat;
use crate::error::{PunchlineError, Result};
use crate::output;
use crate::store::{ApiStore, QueryHandle, QueryOptions};

const HELP: &str = "\
Commands:
  add <artist_uid>            Add an artist to the lineup
  drop <artist_uid>           Remove an artist from the lineup
  delete-artist <artist_uid>  Delete the artist everywhere
  done                        Mark this event as revised
  undo                        Undo the last revision
  refresh                     Refetch from the server
  help                        Show this help
  quit                        Leave the session";

/// One line typed at the prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviseCommand {
    Add(String),
    Drop(String),
    DeleteArtist(String),
    Done,
    Undo,
    Refresh,
    Help,
    Quit,
}

impl FromStr for ReviseCommand {
    type Err = String;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let command = words.next().unwrap_or_default().to_lowercase();
        let argument = words.next().map(str::to_string);

        let needs_artist = |argument: Option<String>| {
            argument.ok_or_else(|| format!("'{command}' needs an artist id"))
        };

        match command.as_str() {
            "add" | "a" => needs_artist(argument).map(Self::Add),
            "drop" | "rm" => needs_artist(argument).map(Self::Drop),
            "delete-artist" => needs_artist(argument).map(Self::DeleteArtist),
            "done" | "d" => Ok(Self::Done),
            "undo" | "u" => Ok(Self::Undo),
            "refresh" | "r" => Ok(Self::Refresh),
            "help" | "?" | "" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command '{other}'. Type 'help' for a list.")),
        }
    }
}

struct ReviseSession {
    store: ApiStore,
    next: QueryHandle,
    pinned: Option<String>,
    event: Option<QueryHandle>,
    revised: usize,
}

impl ReviseSession {
    fn new(store: &ApiStore, pinned: Option<String>) -> Result<Self> {
        let next = store.use_query("findNextEventToRevise", Value::Null, QueryOptions::default())?;
        Ok(Self {
            store: store.clone(),
            next,
            pinned,
            event: None,
            revised: 0,
        })
    }

    /// The event under revision, after any pending refetch lands
    async fn current(&mut self) -> Result<Option<Event>> {
        let event_uid = match &self.pinned {
            Some(uid) => Some(uid.clone()),
            None => {
                let next = self
                    .next
                    .settled()
                    .await
                    .into_result()
                    .map_err(|e| PunchlineError::from_query(e, "event", "next"))?;
                match next {
                    Value::Null => None,
                    value => Some(serde_json::from_value::<Event>(value)?.event_uid),
                }
            }
        };

        let Some(event_uid) = event_uid else {
            self.event = None;
            return Ok(None);
        };

        let args = Args::new().param("event_uid", &event_uid).into_value();
        let fingerprint = self.store.registry().fingerprint("findOneEvent", &args)?;
        let handle = match self.event.take() {
            Some(handle) if *handle.fingerprint() == fingerprint => handle,
            _ => {
                debug!(event_uid = %event_uid, "switching event");
                self.store
                    .use_query("findOneEvent", args, QueryOptions::default())?
            }
        };
        let handle = self.event.insert(handle);

        let value = handle
            .settled()
            .await
            .into_result()
            .map_err(|e| PunchlineError::from_query(e, "event", &event_uid))?;
        Ok(Some(serde_json::from_value(value)?))
    }

    async fn lineup_change(&self, mutation: &str, event: &Event, artist_uid: &str) -> Result<()> {
        let (host_uid, venue_uid) = event.owner_ids().ok_or_else(|| {
            PunchlineError::InvalidArgument(format!(
                "event {} has no venue or host attached",
                event.event_uid
            ))
        })?;

        let args = Args::new()
            .param("host_uid", host_uid)
            .param("venue_uid", venue_uid)
            .param("event_uid", event.event_uid.as_str())
            .param("artist_uid", artist_uid)
            .into_value();
        self.store
            .use_mutation(mutation)?
            .trigger(args)
            .await
            .map_err(|e| PunchlineError::from_query(e, "artist", artist_uid))?;
        Ok(())
    }

    /// Run one command. `Ok(None)` ends the session.
    async fn apply(&mut self, command: ReviseCommand, event: Option<&Event>) -> Result<Option<String>> {
        let require_event = || {
            event.ok_or_else(|| PunchlineError::InvalidArgument("no event to revise".to_string()))
        };

        let message = match command {
            ReviseCommand::Add(artist_uid) => {
                let event = require_event()?;
                if event.has_artist(&artist_uid) {
                    return Ok(Some(format!("{artist_uid} is already on the lineup.")));
                }
                self.lineup_change("addArtist", event, &artist_uid).await?;
                format!("Added {artist_uid}.")
            }
            ReviseCommand::Drop(artist_uid) => {
                let event = require_event()?;
                if !event.has_artist(&artist_uid) {
                    return Ok(Some(format!("{artist_uid} is not on the lineup.")));
                }
                self.lineup_change("dropArtist", event, &artist_uid).await?;
                format!("Dropped {artist_uid}.")
            }
            ReviseCommand::DeleteArtist(artist_uid) => {
                let args = Args::new().param("artist_uid", &artist_uid).into_value();
                self.store
                    .use_mutation("deleteArtist")?
                    .trigger(args)
                    .await
                    .map_err(|e| PunchlineError::from_query(e, "artist", &artist_uid))?;
                // deleteArtist only names the artist, so lineups holding it are refreshed by hand
                if let Some(event) = event {
                    self.store
                        .invalidate_tags(&[Tag::specific("Event", event.event_uid.as_str())]);
                }
                format!("Deleted artist {artist_uid}.")
            }
            ReviseCommand::Done => {
                let event = require_event()?;
                let args = Args::new().param("event_uid", event.event_uid.as_str()).into_value();
                self.store
                    .use_mutation("markEventAsRevised")?
                    .trigger(args)
                    .await
                    .map_err(|e| PunchlineError::from_query(e, "event", &event.event_uid))?;
                self.pinned = None;
                self.revised += 1;
                format!("Marked {} as revised.", event.name)
            }
            ReviseCommand::Undo => {
                self.store
                    .use_mutation("undoLastEventRevision")?
                    .trigger(Value::Null)
                    .await
                    .map_err(PunchlineError::Query)?;
                self.pinned = None;
                self.revised = self.revised.saturating_sub(1);
                "Undid the last revision.".to_string()
            }
            ReviseCommand::Refresh => {
                let refetched = self.store.refetch_active();
                format!("Refreshing {refetched} queries.")
            }
            ReviseCommand::Help => HELP.to_string(),
            ReviseCommand::Quit => return Ok(None),
        };

        Ok(Some(message))
    }
}

/// Drive a session from `input`, writing everything to `out`
pub async fn run_session<R, W>(
    store: &ApiStore,
    start: Option<String>,
    input: R,
    out: &mut W,
) -> Result<String>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut session = ReviseSession::new(store, start)?;
    let mut lines = input.lines();

    loop {
        let event = match session.current().await {
            Ok(event) => event,
            Err(e) => {
                writeln!(out, "{}: {}", "error".red().bold(), e)?;
                session.pinned = None;
                None
            }
        };

        match &event {
            Some(event) => writeln!(out, "{}", output::format_event(event, OutputFormat::Pretty)?)?,
            None => writeln!(out, "{}", "Nothing left to revise.".dimmed())?,
        }

        write!(out, "{} ", "revise>".cyan())?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };

        let command = match line.parse::<ReviseCommand>() {
            Ok(command) => command,
            Err(message) => {
                writeln!(out, "{}", message.yellow())?;
                continue;
            }
        };

        match session.apply(command, event.as_ref()).await {
            Ok(Some(message)) => writeln!(out, "{} {}\n", "✓".green(), message)?,
            Ok(None) => break,
            Err(e) => writeln!(out, "{}: {}\n", "error".red().bold(), e)?,
        }
    }

    Ok(format!("Revised {} event(s) this session.", session.revised))
}

/// Handle the revise command
pub async fn revise(store: &ApiStore, args: &ReviseArgs, format: OutputFormat) -> Result<String> {
    if format == OutputFormat::Json {
        return Err(PunchlineError::InvalidArgument(
            "revise requires interactive mode (--output pretty)".to_string(),
        ));
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    writeln!(stdout, "{}", "Type 'help' for commands.".dimmed())?;
    run_session(store, args.event_uid.clone(), stdin, &mut stdout).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::mock::MockTransport;
    use crate::cache::CacheConfig;
    use serde_json::json;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    fn event_body(uid: &str, artists: &[(&str, &str)]) -> String {
        let artists: Vec<_> = artists
            .iter()
            .map(|(artist_uid, name)| {
                json!({
                    "event_artist_link_uid": format!("l-{artist_uid}"),
                    "artist": {"artist_uid": artist_uid, "name": name}
                })
            })
            .collect();
        json!({
            "event_uid": uid,
            "name": "Late Show",
            "venue": {
                "venue_uid": "v1",
                "name": "The Cellar",
                "host": {"host_uid": "h1", "name": "Giggle Co"}
            },
            "artists": artists
        })
        .to_string()
    }

    fn store(transport: &Rc<MockTransport>) -> ApiStore {
        ApiStore::with_catalog(transport.clone(), CacheConfig::default()).unwrap()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Command Parsing Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_parse_commands() {
        assert_eq!("add a1".parse(), Ok(ReviseCommand::Add("a1".to_string())));
        assert_eq!("  DROP  a2 ".parse(), Ok(ReviseCommand::Drop("a2".to_string())));
        assert_eq!(
            "delete-artist a3".parse(),
            Ok(ReviseCommand::DeleteArtist("a3".to_string()))
        );
        assert_eq!("done".parse(), Ok(ReviseCommand::Done));
        assert_eq!("q".parse(), Ok(ReviseCommand::Quit));
        assert_eq!("".parse(), Ok(ReviseCommand::Help));
    }

    #[test]
    fn test_parse_command_errors() {
        assert!("add".parse::<ReviseCommand>().unwrap_err().contains("artist id"));
        assert!("dance".parse::<ReviseCommand>().unwrap_err().contains("Unknown"));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_add_then_done_moves_on() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/revision/event", Ok(event_body("e1", &[])));
                transport.respond("GET", "/revision/event", Ok(String::new()));
                transport.respond("GET", "/event/e1", Ok(event_body("e1", &[])));
                transport.respond("GET", "/event/e1", Ok(event_body("e1", &[("a1", "Alice Ha")])));
                transport.respond("POST", "/host/h1/venue/v1/event/e1/artist/a1", Ok(String::new()));
                transport.respond("PATCH", "/revision/event/e1/mark-as-revised", Ok(String::new()));

                let mut out = Vec::new();
                let summary = run_session(
                    &store(&transport),
                    None,
                    &b"add a1\ndone\nquit\n"[..],
                    &mut out,
                )
                .await
                .unwrap();

                let out = String::from_utf8(out).unwrap();
                assert!(out.contains("Added a1."));
                assert!(out.contains("Alice Ha"));
                assert!(out.contains("Nothing left to revise."));
                assert_eq!(summary, "Revised 1 event(s) this session.");
                assert_eq!(transport.count("GET", "/event/e1"), 2);
                assert_eq!(transport.count("GET", "/revision/event"), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn test_delete_artist_refreshes_pinned_event() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/revision/event", Ok(String::new()));
                transport.respond("GET", "/event/e7", Ok(event_body("e7", &[("a1", "Alice Ha")])));
                transport.respond("GET", "/event/e7", Ok(event_body("e7", &[])));
                transport.respond("DELETE", "/artist/a1", Ok(String::new()));

                let mut out = Vec::new();
                run_session(
                    &store(&transport),
                    Some("e7".to_string()),
                    &b"delete-artist a1\nquit\n"[..],
                    &mut out,
                )
                .await
                .unwrap();

                let out = String::from_utf8(out).unwrap();
                assert!(out.contains("Deleted artist a1."));
                assert!(out.contains("No artists announced."));
                assert_eq!(transport.count("GET", "/event/e7"), 2);
            })
            .await;
    }

    #[tokio::test]
    async fn test_duplicate_add_skips_request() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/revision/event", Ok(String::new()));
                transport.respond("GET", "/event/e1", Ok(event_body("e1", &[("a1", "Alice Ha")])));

                let mut out = Vec::new();
                run_session(&store(&transport), Some("e1".to_string()), &b"add a1\n"[..], &mut out)
                    .await
                    .unwrap();

                let out = String::from_utf8(out).unwrap();
                assert!(out.contains("already on the lineup"));
                assert!(transport.calls().iter().all(|c| !c.starts_with("POST")));
            })
            .await;
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_session_alive() {
        LocalSet::new()
            .run_until(async {
                let transport = Rc::new(MockTransport::new());
                transport.respond("GET", "/revision/event", Ok(String::new()));

                let mut out = Vec::new();
                run_session(&store(&transport), None, &b"undo\nquit\n"[..], &mut out)
                    .await
                    .unwrap();

                let out = String::from_utf8(out).unwrap();
                assert!(out.contains("error"));
                assert!(out.contains("HTTP 404"));
                assert_eq!(transport.count("PATCH", "/revision/event/undo-last-revision"), 1);
            })
            .await;
    }
}
