//! Settings Module
//!
//! Loads window-manager behavior settings from a TOML file at
//! `~/.config/cohort-wm/settings.toml`.
//! Auto-generates a default settings file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// How input focus follows the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FocusPolicy {
    #[default]
    ClickToFocus,
    FocusFollowsMouse,
    FocusUnderMouse,
    FocusStrictlyUnderMouse,
}

impl FocusPolicy {
    /// Under the pointer-driven policies the manager must not pick focus
    /// targets itself; the pointer position decides.
    pub fn is_reasonable(self) -> bool {
        matches!(self, Self::ClickToFocus | Self::FocusFollowsMouse)
    }
}

/// What happens when a window on another desktop gets activated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ActivationDesktopPolicy {
    /// Switch to the desktop the window lives on.
    #[default]
    SwitchToOtherDesktop,
    /// Pull the window onto the current desktop instead.
    BringToCurrentDesktop,
}

/// Behavior settings for the relationship and activation core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowManagerSettings {
    pub focus_policy: FocusPolicy,
    /// Constrain activation picks to the active screen.
    pub separate_screen_focus: bool,
    pub activation_desktop_policy: ActivationDesktopPolicy,
    /// Number of virtual desktops.
    pub desktop_count: u32,
}

impl Default for WindowManagerSettings {
    fn default() -> Self {
        Self {
            focus_policy: FocusPolicy::default(),
            separate_screen_focus: false,
            activation_desktop_policy: ActivationDesktopPolicy::default(),
            desktop_count: 4,
        }
    }
}

impl WindowManagerSettings {
    /// Load settings from file, or use defaults if the file doesn't exist
    pub fn load() -> Result<Self> {
        let settings_path = Self::settings_path()?;

        if !settings_path.exists() {
            info!("Settings file not found at {:?}, using defaults", settings_path);
            if let Err(e) = Self::save_default(&settings_path) {
                warn!("Failed to create default settings file: {}", e);
            }
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(&settings_path).context("Failed to read settings file")?;

        let settings: WindowManagerSettings =
            toml::from_str(&content).context("Failed to parse settings file")?;

        info!("Settings loaded from {:?}", settings_path);
        debug!("Settings: {:?}", settings);

        Ok(settings)
    }

    fn settings_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("cohort-wm");

        Ok(config_dir.join("settings.toml"))
    }

    fn save_default(path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create settings directory")?;
        }

        let defaults = Self::default();
        let toml_string =
            toml::to_string_pretty(&defaults).context("Failed to serialize default settings")?;

        fs::write(path, toml_string).context("Failed to write default settings file")?;

        info!("Created default settings file at {:?}", path);
        Ok(())
    }
}
