//! Lifecycle events delivered by the host browser.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::browser::TabInfo;
use crate::types::{TabId, WindowId};

/// A browser lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BrowserEvent {
    /// The selected tab of a window changed.
    TabActivated { tab_id: TabId, window_id: WindowId },
    /// A tab changed. `url` is only present when the URL itself changed.
    TabUpdated {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        tab: TabInfo,
    },
    /// Window focus moved. `None` means no browser window has focus.
    WindowFocusChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
    },
    /// A tab was closed.
    TabRemoved {
        tab_id: TabId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        window_id: Option<WindowId>,
    },
    /// The browser started with the tracker already installed.
    Startup,
    /// The tracker was installed or updated.
    Installed,
}

impl BrowserEvent {
    /// Short event name used in logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::TabActivated { .. } => "tab_activated",
            Self::TabUpdated { .. } => "tab_updated",
            Self::WindowFocusChanged { .. } => "window_focus_changed",
            Self::TabRemoved { .. } => "tab_removed",
            Self::Startup => "startup",
            Self::Installed => "installed",
        }
    }
}

impl fmt::Display for BrowserEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tagged_events() {
        let event: BrowserEvent =
            serde_json::from_str(r#"{"type": "tab_activated", "tab_id": 3, "window_id": 1}"#)
                .unwrap();
        assert_eq!(
            event,
            BrowserEvent::TabActivated {
                tab_id: TabId(3),
                window_id: WindowId(1)
            }
        );

        let event: BrowserEvent = serde_json::from_str(r#"{"type": "startup"}"#).unwrap();
        assert_eq!(event, BrowserEvent::Startup);
    }

    #[test]
    fn focus_lost_has_no_window() {
        let event: BrowserEvent =
            serde_json::from_str(r#"{"type": "window_focus_changed"}"#).unwrap();
        assert_eq!(event, BrowserEvent::WindowFocusChanged { window_id: None });
    }

    #[test]
    fn tab_updated_without_url_change() {
        let event: BrowserEvent = serde_json::from_str(
            r#"{"type": "tab_updated", "tab_id": 2, "tab": {"id": 2, "active": true}}"#,
        )
        .unwrap();
        let BrowserEvent::TabUpdated { url, tab, .. } = event else {
            panic!("expected tab_updated");
        };
        assert!(url.is_none());
        assert!(tab.active);
    }

    #[test]
    fn unknown_event_type_is_rejected() {
        let result: Result<BrowserEvent, _> = serde_json::from_str(r#"{"type": "bookmark_added"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn display_uses_wire_name() {
        let event = BrowserEvent::TabRemoved {
            tab_id: TabId(1),
            window_id: None,
        };
        assert_eq!(event.to_string(), "tab_removed");
    }
}
