//! Configuration loading and parsing.
//!
//! Parses `vicore.toml` (or an override path provided by the binary) into
//! editing options and register settings. Unknown fields are ignored, missing
//! sections take defaults, and a parse error falls back to the defaults with a
//! warning. Raw values are kept in `file`; the `effective_*` fields hold the
//! values after clamping (`tabstop = 0` and friends are not usable as-is).

use anyhow::Result;
use serde::Deserialize;
use std::{fs, path::PathBuf};
use tracing::{info, warn};

const DEFAULT_TEXTWIDTH: usize = 79;

#[derive(Debug, Deserialize, Clone)]
pub struct EditingConfig {
    #[serde(default = "EditingConfig::default_tabstop")]
    pub tabstop: usize,
    #[serde(default = "EditingConfig::default_shiftwidth")]
    pub shiftwidth: usize,
    #[serde(default)]
    pub shiftround: bool,
    #[serde(default = "EditingConfig::default_joinspaces")]
    pub joinspaces: bool,
    /// 0 means "format at 79 columns".
    #[serde(default)]
    pub textwidth: usize,
    #[serde(default = "EditingConfig::default_startofline")]
    pub startofline: bool,
    /// Line-count threshold above which yank/delete/shift report a message.
    #[serde(default = "EditingConfig::default_report")]
    pub report: usize,
    /// Program handed to the Ex collaborator by the `=` operator.
    #[serde(default)]
    pub equalprg: String,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            tabstop: Self::default_tabstop(),
            shiftwidth: Self::default_shiftwidth(),
            shiftround: false,
            joinspaces: Self::default_joinspaces(),
            textwidth: 0,
            startofline: Self::default_startofline(),
            report: Self::default_report(),
            equalprg: String::new(),
        }
    }
}

impl EditingConfig {
    const fn default_tabstop() -> usize {
        8
    }
    const fn default_shiftwidth() -> usize {
        8
    }
    const fn default_joinspaces() -> bool {
        true
    }
    const fn default_startofline() -> bool {
        true
    }
    const fn default_report() -> usize {
        2
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RegistersConfig {
    /// Per-register size cap in bytes; 0 disables the cap.
    #[serde(default)]
    pub max_bytes: usize,
    /// Load and save register history.
    #[serde(default = "RegistersConfig::default_history")]
    pub history: bool,
    /// Empty means the platform data directory.
    #[serde(default)]
    pub history_path: String,
    /// Lines saved per register; absent saves everything.
    #[serde(default)]
    pub history_max_lines: Option<usize>,
}

impl Default for RegistersConfig {
    fn default() -> Self {
        Self {
            max_bytes: 0,
            history: Self::default_history(),
            history_path: String::new(),
            history_max_lines: None,
        }
    }
}

impl RegistersConfig {
    const fn default_history() -> bool {
        true
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
pub struct ConfigFile {
    #[serde(default)]
    pub editing: EditingConfig,
    #[serde(default)]
    pub registers: RegistersConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub raw: Option<String>, // original file string (optional)
    pub file: ConfigFile,    // parsed (or default) data
    pub effective_tabstop: usize,
    pub effective_shiftwidth: usize,
    pub effective_textwidth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_file(None, ConfigFile::default())
    }
}

/// Best-effort config path following platform conventions (XDG / AppData Roaming).
pub fn discover() -> PathBuf {
    let local = PathBuf::from("vicore.toml");
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("vicore").join("vicore.toml");
    }
    PathBuf::from("vicore.toml")
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match toml::from_str::<ConfigFile>(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), "config_loaded");
            Ok(Config::from_file(Some(content), file))
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_error_using_defaults");
            Ok(Config::default())
        }
    }
}

impl Config {
    pub fn from_file(raw: Option<String>, file: ConfigFile) -> Self {
        let mut cfg = Self {
            raw,
            file,
            effective_tabstop: 0,
            effective_shiftwidth: 0,
            effective_textwidth: 0,
        };
        cfg.apply_defaults();
        cfg
    }

    /// Recompute the effective option values from the raw file values.
    pub fn apply_defaults(&mut self) {
        let editing = &self.file.editing;
        let tabstop = if editing.tabstop == 0 {
            info!(target: "config", raw = 0, clamped = 8, "tabstop_clamped");
            8
        } else {
            editing.tabstop
        };
        let shiftwidth = if editing.shiftwidth == 0 {
            info!(target: "config", raw = 0, clamped = tabstop, "shiftwidth_follows_tabstop");
            tabstop
        } else {
            editing.shiftwidth
        };
        let textwidth = if editing.textwidth == 0 {
            DEFAULT_TEXTWIDTH
        } else {
            editing.textwidth
        };
        self.effective_tabstop = tabstop;
        self.effective_shiftwidth = shiftwidth;
        self.effective_textwidth = textwidth;
    }

    /// Where register history lives: the configured path, else the platform
    /// data directory, else the working directory.
    pub fn history_path(&self) -> PathBuf {
        let configured = self.file.registers.history_path.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        if let Some(dir) = dirs::data_dir() {
            return dir.join("vicore").join("registers.txt");
        }
        PathBuf::from("vicore_registers.txt")
    }
}
