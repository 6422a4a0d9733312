//! The browser event feed and the window model it maintains.
//!
//! The feed is a stream of JSON lines, one [`FeedMessage`] per line:
//!
//! ```json
//! {"timestamp": "2025-01-01T09:00:00Z", "event": {"type": "startup"}, "windows": [
//!   {"id": 1, "focused": true, "tabs": [{"id": 7, "url": "https://docs.rs/", "active": true}]}
//! ]}
//! {"timestamp": "2025-01-01T09:05:00Z", "event": {"type": "window_focus_changed"}}
//! ```
//!
//! `windows` is an optional full snapshot of the browser. Without one, the
//! event itself is applied to the last known model.

use chrono::{DateTime, Utc};
use dt_core::{Browser, BrowserError, BrowserEvent, TabInfo, WindowId, WindowInfo, WindowKind};
use serde::{Deserialize, Serialize};

/// One line of the event feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedMessage {
    /// When the event happened. Absent for live feeds, which use wall-clock time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub event: BrowserEvent,
    /// Full browser state after the event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<WindowInfo>>,
}

/// Parses one feed line. Blank lines yield `None`.
pub fn parse_line(line: &str) -> Result<Option<FeedMessage>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

/// Browser model kept up to date from the feed.
#[derive(Debug, Default)]
pub struct SnapshotBrowser {
    windows: Option<Vec<WindowInfo>>,
}

impl SnapshotBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the model with a full snapshot.
    pub fn replace(&mut self, windows: Vec<WindowInfo>) {
        self.windows = Some(windows);
    }

    /// Applies the state change an event implies.
    pub fn observe(&mut self, event: &BrowserEvent) {
        match event {
            BrowserEvent::TabActivated { tab_id, window_id } => {
                let window = self.window_mut(*window_id);
                for tab in &mut window.tabs {
                    tab.active = tab.id == *tab_id;
                }
                if !window.tabs.iter().any(|t| t.id == *tab_id) {
                    window.tabs.push(TabInfo {
                        id: *tab_id,
                        window_id: Some(*window_id),
                        url: None,
                        active: true,
                    });
                }
            }
            BrowserEvent::TabUpdated { tab_id, url, tab } => {
                let mut updated = tab.clone();
                updated.id = *tab_id;
                if url.is_some() {
                    updated.url.clone_from(url);
                }
                self.upsert_tab(updated);
            }
            BrowserEvent::WindowFocusChanged { window_id } => {
                if let Some(id) = window_id {
                    self.window_mut(*id);
                }
                for window in self.windows.get_or_insert_with(Vec::new) {
                    window.focused = Some(window.id) == *window_id;
                }
            }
            BrowserEvent::TabRemoved { tab_id, .. } => {
                for window in self.windows.get_or_insert_with(Vec::new) {
                    window.tabs.retain(|t| t.id != *tab_id);
                }
            }
            BrowserEvent::Startup | BrowserEvent::Installed => {}
        }
    }

    fn window_mut(&mut self, id: WindowId) -> &mut WindowInfo {
        let windows = self.windows.get_or_insert_with(Vec::new);
        let index = if let Some(index) = windows.iter().position(|w| w.id == id) {
            index
        } else {
            windows.push(WindowInfo {
                id,
                focused: false,
                kind: WindowKind::Normal,
                tabs: Vec::new(),
            });
            windows.len() - 1
        };
        &mut windows[index]
    }

    fn upsert_tab(&mut self, tab: TabInfo) {
        let windows = self.windows.get_or_insert_with(Vec::new);
        let current = windows.iter().find_map(|w| {
            w.tabs.iter().any(|t| t.id == tab.id).then_some(w.id)
        });

        // A tab whose window is unknown stays where it is, or is dropped.
        let Some(window_id) = tab.window_id.or(current) else {
            return;
        };
        if current.is_some_and(|id| id != window_id) {
            for window in windows.iter_mut() {
                window.tabs.retain(|t| t.id != tab.id);
            }
        }

        let window = self.window_mut(window_id);
        if tab.active {
            for other in &mut window.tabs {
                other.active = false;
            }
        }
        if let Some(existing) = window.tabs.iter_mut().find(|t| t.id == tab.id) {
            *existing = tab;
        } else {
            window.tabs.push(tab);
        }
    }
}

impl Browser for SnapshotBrowser {
    fn windows(&self) -> Result<Vec<WindowInfo>, BrowserError> {
        self.windows.clone().ok_or(BrowserError::Unavailable)
    }
}
