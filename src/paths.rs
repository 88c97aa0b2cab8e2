//! Application path resolution.
//!
//! Finds the configuration file for both development runs (config next to
//! the project, typical with `cargo run`) and installed mode (platform
//! config directory via `dirs`).

use std::path::PathBuf;

/// Application name used for the config directory in installed mode
const APP_NAME: &str = "synth-editor";

/// Resolved application paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Whether the config was found next to the working directory (dev mode)
    pub is_dev: bool,
}

impl AppPaths {
    /// Detect the appropriate config location.
    ///
    /// If `config.yaml` exists in the current working directory, use it
    /// directly. Otherwise fall back to the platform config directory
    /// (`~/.config/synth-editor` on Linux, `%APPDATA%` on Windows).
    ///
    /// Called before logging is initialized, so diagnostics go to eprintln.
    pub fn detect() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cwd_config = cwd.join("config.yaml");
        if cwd_config.exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] using config.yaml from cwd: {}", cwd.display());
            return Self {
                config: cwd_config,
                is_dev: true,
            };
        }

        let base = dirs::config_dir()
            .unwrap_or_else(|| {
                eprintln!("[paths] WARNING: no config directory, falling back to cwd");
                cwd
            })
            .join(APP_NAME);

        Self {
            config: base.join("config.yaml"),
            is_dev: false,
        }
    }
}
