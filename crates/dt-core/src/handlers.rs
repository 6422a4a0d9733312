//! Translating browser events into accountant transitions.
//!
//! Handlers hold no state: each event is turned into exactly one [`Signal`]
//! by asking the browser what is active right now, through the same
//! [`active_domain`] query the restart path uses.
//!
//! # Ordering
//!
//! Events must reach [`dispatch`] one at a time, in arrival order. Two handlers
//! whose browser queries overlap (both read the current tab before either
//! switches) can still settle on a stale domain; the accountant cannot detect
//! this, so callers funnel events through a single consumer.

use crate::accountant::{AccountError, Accountant};
use crate::browser::{Browser, active_domain};
use crate::clock::Clock;
use crate::event::BrowserEvent;
use crate::totals::TotalsStore;
use crate::types::DomainId;

/// What an event asks of the accountant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signal {
    /// Switch to the given domain, or go idle.
    Switch(Option<DomainId>),
    /// Re-initialize from the browser's current state.
    Recover,
    /// Nothing relevant changed.
    Unchanged,
}

/// Decides what `event` means for the active domain.
pub fn translate<B: Browser + ?Sized>(event: &BrowserEvent, browser: &B) -> Signal {
    match event {
        BrowserEvent::WindowFocusChanged { window_id: None } => Signal::Switch(None),
        BrowserEvent::TabActivated { .. }
        | BrowserEvent::TabRemoved { .. }
        | BrowserEvent::WindowFocusChanged { window_id: Some(_) } => {
            Signal::Switch(active_domain(browser))
        }
        BrowserEvent::TabUpdated { url, tab, .. } => {
            if url.is_some() && tab.active {
                Signal::Switch(active_domain(browser))
            } else {
                Signal::Unchanged
            }
        }
        BrowserEvent::Startup | BrowserEvent::Installed => Signal::Recover,
    }
}

/// Translates `event` and applies it to `accountant`.
pub fn dispatch<S, C, B>(
    accountant: &mut Accountant<S, C>,
    event: &BrowserEvent,
    browser: &B,
) -> Result<Signal, AccountError>
where
    S: TotalsStore,
    C: Clock,
    B: Browser + ?Sized,
{
    let signal = translate(event, browser);
    tracing::debug!(event = %event, ?signal, "dispatching event");

    match &signal {
        Signal::Switch(domain) => accountant.switch_to(domain.clone())?,
        Signal::Recover => accountant.initialize(browser)?,
        Signal::Unchanged => {}
    }
    Ok(signal)
}
