use std::fs;
use std::path::PathBuf;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

use crate::error::Result;

/// Environment variable overriding the configuration directory
pub const HOME_ENV: &str = "PUNCHLINE_HOME";

/// Where punchline keeps its configuration
#[derive(Debug, Clone)]
pub struct Paths {
    /// Root configuration directory (~/.punchline)
    pub root: PathBuf,
    /// Configuration file path (~/.punchline/config.toml)
    pub config_file: PathBuf,
}

impl Paths {
    /// Resolve `$PUNCHLINE_HOME`, falling back to `~/.punchline`
    pub fn new() -> Result<Self> {
        let root = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => PathBuf::from(std::env::var("HOME")?).join(".punchline"),
        };
        Ok(Self::at(root))
    }

    /// Paths rooted at an explicit directory
    pub fn at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            config_file: root.join("config.toml"),
            root,
        }
    }

    /// Ensure the configuration directory exists, owner-only
    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;

        #[cfg(unix)]
        fs::set_permissions(&self.root, fs::Permissions::from_mode(0o700))?;

        Ok(())
    }

    pub fn config_exists(&self) -> bool {
        self.config_file.exists()
    }
}
