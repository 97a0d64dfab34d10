mod paths;
mod settings;

pub use paths::{Paths, HOME_ENV};
pub use settings::{ApiConfig, CacheSettings, Config, LogConfig, OutputConfig};
