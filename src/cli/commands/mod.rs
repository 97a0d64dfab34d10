mod call;
mod common;
mod config;
mod listings;
mod open;
mod revise;
mod search;

pub use self::call::{call, endpoints};
pub use self::config::config;
pub use self::listings::{artist, event, events, host, hosts, room, venue};
pub use self::open::open;
pub use self::revise::{revise, run_session, ReviseCommand};
pub use self::search::{location, search};
