//! Shared helper functions for CLI commands
//!
//! This module contains utility functions that are used across multiple
//! command modules to avoid code duplication.

use miette::{IntoDiagnostic, Result};
use std::io::{self, IsTerminal};

use crate::cli::GlobalOpts;
use crate::core::config::Config;
use crate::core::inspection::{Inspection, PhaseBook};
use crate::core::session::SessionError;
use crate::core::store::SqliteStore;
use crate::core::workspace::Workspace;
use crate::entities::context::Phase;

/// Everything a session command needs, loaded from the current workspace
pub struct SessionContext {
    pub workspace: Workspace,
    pub config: Config,
    pub inspection: Inspection,
    pub phase: Phase,
}

impl SessionContext {
    /// Discover the workspace and load its config and session
    pub fn open(global: &GlobalOpts) -> Result<Self> {
        let workspace = Workspace::discover().map_err(|e| miette::miette!("{}", e))?;
        let config = Config::load(workspace.root()).map_err(|e| miette::miette!("{}", e))?;
        let inspection = workspace.load().map_err(|e| miette::miette!("{}", e))?;
        let phase = global.phase.unwrap_or(config.default_phase);
        Ok(Self {
            workspace,
            config,
            inspection,
            phase,
        })
    }

    pub fn book(&self) -> Result<&PhaseBook> {
        self.inspection.phase(self.phase).map_err(session_error)
    }

    pub fn book_mut(&mut self) -> Result<&mut PhaseBook> {
        self.inspection.phase_mut(self.phase).map_err(session_error)
    }

    /// Write the session back to `.qcm/session.yaml`
    pub fn save(&self) -> Result<()> {
        self.workspace
            .save(&self.inspection)
            .map_err(|e| miette::miette!("{}", e))
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        let path = self.config.store_path(self.workspace.root());
        SqliteStore::open(&path).map_err(|e| miette::miette!("{}", e))
    }
}

/// Turn a session error into a report, listing every missing cell
pub fn session_error(err: SessionError) -> miette::Report {
    match &err {
        SessionError::Incomplete(missing) => {
            let lines: Vec<String> = missing.iter().map(|m| format!("  {}", m)).collect();
            miette::miette!("{}:\n{}", err, lines.join("\n"))
        }
        _ => miette::miette!("{}", err),
    }
}

/// Convert a 1-based position from the command line
pub fn position(value: usize, what: &str) -> Result<usize> {
    value
        .checked_sub(1)
        .ok_or_else(|| miette::miette!("{} numbers start at 1", what))
}

/// Truncate a string to max_len characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Ask before a destructive step unless told not to or not interactive
pub fn confirm(prompt: &str, assume_yes: bool) -> Result<bool> {
    if assume_yes || !io::stdin().is_terminal() {
        return Ok(true);
    }
    dialoguer::Confirm::with_theme(&dialoguer::theme::ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()
        .into_diagnostic()
}
