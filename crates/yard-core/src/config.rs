//! User settings: workspaces, markets and the cache location.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use yard_fs::ConfigStore;

use crate::error::{Error, Result};

/// Environment variable overriding the settings home directory.
pub const HOME_ENV: &str = "YARD_HOME";

/// Settings file name inside the home directory.
pub const SETTINGS_FILE: &str = "settings.toml";

/// Name of the workspace used when none is configured.
pub const DEFAULT_WORKSPACE: &str = "default";

/// A workspace: a directory of locally developed blocks plus the markets it reads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceSettings {
    pub path: PathBuf,
    #[serde(default)]
    pub markets: Vec<String>,
}

/// A market known to the installation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSettings {
    pub path: PathBuf,
}

/// Contents of `settings.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub active_workspace: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub workspaces: BTreeMap<String, WorkspaceSettings>,
    pub markets: BTreeMap<String, MarketSettings>,

    /// Directory the settings were loaded from.
    #[serde(skip)]
    home: PathBuf,
}

impl Settings {
    /// Resolve the settings home.
    ///
    /// Uses `$YARD_HOME` when set, otherwise `~/.yard`.
    pub fn default_home() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }
        dirs::home_dir()
            .map(|h| h.join(".yard"))
            .ok_or_else(|| Error::Config {
                message: format!("cannot determine a home directory; set {HOME_ENV}"),
            })
    }

    /// Load settings from `home`. A missing file yields defaults rooted at
    /// the current directory.
    pub fn load(home: &Path) -> Result<Self> {
        let path = home.join(SETTINGS_FILE);
        let mut settings: Settings = ConfigStore::new().load_or_default(&path)?;
        settings.home = home.to_path_buf();

        if settings.workspaces.is_empty() {
            tracing::debug!(path = %path.display(), "no workspaces configured, using current directory");
            let cwd = std::env::current_dir()?;
            settings.workspaces.insert(
                DEFAULT_WORKSPACE.to_string(),
                WorkspaceSettings {
                    path: cwd,
                    markets: Vec::new(),
                },
            );
        }
        Ok(settings)
    }

    /// Write settings back to the home they were loaded from.
    pub fn save(&self) -> Result<()> {
        ConfigStore::new().save(&self.home.join(SETTINGS_FILE), self)?;
        Ok(())
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Root of the installation cache.
    pub fn cache_root(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(|| self.home.join("cache"))
    }

    /// The active workspace's name and settings.
    ///
    /// Falls back to the `default` workspace, then to the first one configured.
    pub fn active(&self) -> Result<(&str, &WorkspaceSettings)> {
        if let Some(name) = &self.active_workspace {
            return self
                .workspaces
                .get_key_value(name)
                .map(|(k, v)| (k.as_str(), v))
                .ok_or_else(|| Error::Config {
                    message: format!("active workspace '{name}' is not defined"),
                });
        }
        self.workspaces
            .get_key_value(DEFAULT_WORKSPACE)
            .or_else(|| self.workspaces.iter().next())
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| Error::Config {
                message: "no workspace is configured".to_string(),
            })
    }

    /// Register a workspace. Names are unique regardless of case.
    ///
    /// The first workspace added to settings without an active one becomes
    /// active.
    pub fn add_workspace(&mut self, name: &str, path: &Path) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Config {
                message: "workspace name must not be empty".to_string(),
            });
        }
        if let Some(existing) = find_key(&self.workspaces, name) {
            return Err(Error::Config {
                message: format!("workspace '{existing}' already exists"),
            });
        }
        self.workspaces.insert(
            name.to_string(),
            WorkspaceSettings {
                path: path.to_path_buf(),
                markets: Vec::new(),
            },
        );
        tracing::info!(workspace = name, path = %path.display(), "added workspace");
        if self.active_workspace.is_none() {
            self.active_workspace = Some(name.to_string());
        }
        Ok(())
    }

    /// Make `name` the active workspace.
    pub fn activate_workspace(&mut self, name: &str) -> Result<()> {
        let key = find_key(&self.workspaces, name)
            .ok_or_else(|| Error::Config {
                message: format!("workspace '{name}' is not defined"),
            })?
            .to_string();
        tracing::info!(workspace = %key, "activated workspace");
        self.active_workspace = Some(key);
        Ok(())
    }

    /// Register a market directory. An existing market of the same name is
    /// pointed at the new directory.
    pub fn add_market(&mut self, name: &str, path: &Path) {
        let key = find_key(&self.markets, name)
            .map_or_else(|| name.trim().to_string(), str::to_string);
        tracing::info!(market = %key, path = %path.display(), "registered market");
        self.markets.insert(
            key,
            MarketSettings {
                path: path.to_path_buf(),
            },
        );
    }

    /// Link a registered market to the active workspace.
    ///
    /// Returns whether the link list changed.
    pub fn link_market(&mut self, name: &str) -> Result<bool> {
        let market = find_key(&self.markets, name)
            .ok_or_else(|| Error::Config {
                message: format!("market '{name}' is not registered"),
            })?
            .to_string();
        let workspace = self.active_mut()?;
        if workspace.markets.iter().any(|m| m.eq_ignore_ascii_case(&market)) {
            tracing::info!(market = %market, "market already linked");
            return Ok(false);
        }
        workspace.markets.push(market.clone());
        tracing::info!(market = %market, "linked market");
        Ok(true)
    }

    /// Unlink a market from the active workspace.
    ///
    /// Returns whether the link list changed.
    pub fn unlink_market(&mut self, name: &str) -> Result<bool> {
        let workspace = self.active_mut()?;
        let before = workspace.markets.len();
        workspace.markets.retain(|m| !m.eq_ignore_ascii_case(name));
        let changed = workspace.markets.len() != before;
        if changed {
            tracing::info!(market = name, "unlinked market");
        } else {
            tracing::info!(market = name, "market was not linked");
        }
        Ok(changed)
    }

    fn active_mut(&mut self) -> Result<&mut WorkspaceSettings> {
        let name = self.active()?.0.to_string();
        self.workspaces.get_mut(&name).ok_or_else(|| Error::Config {
            message: format!("active workspace '{name}' is not defined"),
        })
    }

    /// Markets linked to the active workspace, as (name, directory).
    ///
    /// Names with no `[markets]` entry are skipped with a warning.
    pub fn active_markets(&self) -> Result<Vec<(String, PathBuf)>> {
        let (workspace, settings) = self.active()?;
        Ok(settings
            .markets
            .iter()
            .filter_map(|name| match self.markets.get(name) {
                Some(market) => Some((name.clone(), market.path.clone())),
                None => {
                    tracing::warn!(workspace, market = %name, "workspace links an unknown market");
                    None
                }
            })
            .collect())
    }
}

/// Key of `map` equal to `name` ignoring case.
fn find_key<'a, V>(map: &'a BTreeMap<String, V>, name: &str) -> Option<&'a str> {
    let name = name.trim();
    map.keys()
        .find(|k| k.eq_ignore_ascii_case(name))
        .map(String::as_str)
}
