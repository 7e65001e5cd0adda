//! Wireless network visibility.
//!
//! The exit-confirmation logic asks which network names are currently
//! associated or visible. Queries are synchronous reads of current state.

use std::collections::HashSet;
use std::process::Command;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::error::{GeowatchError, Result};

/// Reports the currently associated wireless network names.
pub trait NetworkInfoProvider: Send {
    /// Network names visible right now.
    ///
    /// # Errors
    ///
    /// Returns [`GeowatchError::NetworkQueryFailed`] if the platform cannot be queried.
    fn current_network_names(&self) -> Result<HashSet<String>>;
}

/// Network names set explicitly, by an API client or a test.
///
/// Clones share the same set.
#[derive(Debug, Clone, Default)]
pub struct StaticNetworkInfo {
    names: Arc<RwLock<HashSet<String>>>,
}

impl StaticNetworkInfo {
    /// Create a provider reporting `names`.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let provider = Self::default();
        provider.set(names);
        provider
    }

    /// Replace the reported names.
    pub fn set<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut guard = self.names.write().unwrap_or_else(PoisonError::into_inner);
        *guard = names.into_iter().map(Into::into).collect();
    }
}

impl NetworkInfoProvider for StaticNetworkInfo {
    fn current_network_names(&self) -> Result<HashSet<String>> {
        Ok(self
            .names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }
}

/// Arguments passed to `nmcli`.
///
/// `--rescan no` keeps the query to NetworkManager's cached access-point list
/// instead of waiting on a fresh scan.
pub const NMCLI_ARGS: [&str; 7] = ["-t", "-f", "ACTIVE,SSID", "dev", "wifi", "--rescan", "no"];

/// Reads the active Wi-Fi association from NetworkManager via `nmcli`.
#[derive(Debug, Clone)]
pub struct NmcliNetworkInfo {
    program: String,
}

impl Default for NmcliNetworkInfo {
    fn default() -> Self {
        Self {
            program: "nmcli".to_string(),
        }
    }
}

impl NmcliNetworkInfo {
    /// Use a specific `nmcli` binary.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl NetworkInfoProvider for NmcliNetworkInfo {
    fn current_network_names(&self) -> Result<HashSet<String>> {
        let output = Command::new(&self.program)
            .args(NMCLI_ARGS)
            .output()
            .map_err(|e| {
                GeowatchError::NetworkQueryFailed(format!("failed to run {}: {e}", self.program))
            })?;

        if !output.status.success() {
            return Err(GeowatchError::NetworkQueryFailed(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let names = parse_nmcli_active(&String::from_utf8_lossy(&output.stdout));
        debug!(count = names.len(), "queried active wifi networks");
        Ok(names)
    }
}

/// Parse `nmcli -t -f ACTIVE,SSID dev wifi` output into active SSIDs.
///
/// Terse mode escapes `:` and `\` inside field values with a backslash.
#[must_use]
pub fn parse_nmcli_active(output: &str) -> HashSet<String> {
    output
        .lines()
        .filter_map(|line| {
            let (active, ssid) = split_terse(line)?;
            (active == "yes" && !ssid.is_empty()).then_some(ssid)
        })
        .collect()
}

fn split_terse(line: &str) -> Option<(String, String)> {
    let mut fields = Vec::with_capacity(2);
    let mut current = String::new();
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            ':' if fields.is_empty() => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);

    match <[String; 2]>::try_from(fields) {
        Ok([active, ssid]) => Some((active, ssid)),
        Err(_) => None,
    }
}
