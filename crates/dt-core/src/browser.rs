//! Host browser model: windows, tabs, and what is active right now.
//!
//! The host environment owns the real window/tab state; this module only
//! describes the records it hands back and the single query every event
//! handler uses to decide which domain is active.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::resolve;
use crate::types::{DomainId, TabId, WindowId};

/// Errors from querying the host browser.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrowserError {
    /// The host has not reported any window state yet.
    #[error("no window state available")]
    Unavailable,
    /// The host rejected the query.
    #[error("browser query failed: {0}")]
    Query(String),
}

/// A tab as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: TabId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_id: Option<WindowId>,
    /// Missing for tabs the host will not disclose a URL for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Whether this is the selected tab of its window.
    #[serde(default)]
    pub active: bool,
}

/// The kind of a browser window. Only normal windows count towards activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    #[default]
    Normal,
    Popup,
    Panel,
    Devtools,
}

/// A window and its tabs as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub id: WindowId,
    #[serde(default)]
    pub focused: bool,
    #[serde(default)]
    pub kind: WindowKind,
    #[serde(default)]
    pub tabs: Vec<TabInfo>,
}

impl WindowInfo {
    /// The selected tab of this window, if any.
    pub fn active_tab(&self) -> Option<&TabInfo> {
        self.tabs.iter().find(|t| t.active)
    }
}

/// Read access to the host's window and tab enumeration.
pub trait Browser {
    /// All open windows with their tabs populated.
    fn windows(&self) -> Result<Vec<WindowInfo>, BrowserError>;
}

/// Resolves the domain that is active right now.
///
/// A domain is active when its tab is the selected tab of the focused normal
/// window. Query failures, an unfocused browser, a window with no selected tab
/// and unresolvable URLs all yield `None`.
pub fn active_domain<B: Browser + ?Sized>(browser: &B) -> Option<DomainId> {
    let windows = match browser.windows() {
        Ok(windows) => windows,
        Err(e) => {
            tracing::debug!(error = %e, "window query failed, treating as idle");
            return None;
        }
    };

    let window = windows
        .iter()
        .find(|w| w.focused && w.kind == WindowKind::Normal)?;
    let tab = window.active_tab()?;
    resolve(tab.url.as_deref())
}
