//! Core domain logic for the per-domain time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Resolution: mapping URLs to the domain time is attributed to
//! - Accounting: tracking the active domain and persisting elapsed seconds
//! - Event handling: turning browser lifecycle events into domain switches

mod accountant;
pub mod browser;
mod clock;
mod domain;
pub mod event;
pub mod handlers;
mod totals;
mod types;

pub use accountant::{AccountError, Accountant, ActiveSession, Commit};
pub use browser::{Browser, BrowserError, TabInfo, WindowInfo, WindowKind, active_domain};
pub use clock::{Clock, ManualClock, SystemClock};
pub use domain::resolve;
pub use event::BrowserEvent;
pub use handlers::{Signal, dispatch, translate};
pub use totals::{DomainTotals, MemoryStore, StoreError, TOTALS_KEY, TotalsStore};
pub use types::{DomainId, TabId, ValidationError, WindowId};
