//! Active-domain accounting.
//!
//! The [`Accountant`] owns the single "which domain is active, and since when"
//! session and is the only writer of the persisted [`DomainTotals`].
//!
//! # State Machine
//!
//! Two states: idle (no session) and tracking a domain. Every transition goes
//! through [`Accountant::switch_to`], which first flushes the time accrued by
//! the previous session and only then installs the new one. A redundant switch
//! to the same domain still flushes and restarts the session.
//!
//! # Failure Handling
//!
//! A session's start time only advances after the store has accepted the
//! write. When a flush fails during a switch, the switch still completes and
//! the unflushed seconds are parked in a carry-over ledger. Every later switch
//! writes the ledger out, whether or not the session it ends has whole seconds
//! of its own, so going idle on shutdown drains it. The ledger is in-memory, so
//! it is lost along with the active session on restart.
//!
//! Totals are loaded before every write, so a reset by another writer takes
//! effect on the next flush. Seconds parked before such a reset still land in
//! the emptied mapping.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::browser::{Browser, active_domain};
use crate::clock::Clock;
use crate::totals::{DomainTotals, StoreError, TotalsStore};
use crate::types::DomainId;

/// Accounting errors. Each wraps the store failure that caused it.
#[derive(Debug, Error)]
pub enum AccountError {
    /// Reading the current totals failed.
    #[error("failed to load domain totals")]
    Load(#[source] StoreError),
    /// Writing the merged totals failed.
    #[error("failed to save domain totals")]
    Save(#[source] StoreError),
}

/// The domain currently being timed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSession {
    pub domain: DomainId,
    /// Start of the interval not yet written to the store.
    pub since: DateTime<Utc>,
}

/// Result of a successful [`Accountant::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    /// Nothing was active.
    Idle,
    /// Less than a whole second elapsed; the session restarted without a write.
    Truncated,
    /// `seconds` were added to `domain` and written to the store.
    Flushed { domain: DomainId, seconds: u64 },
}

/// Tracks the active domain and folds elapsed time into the store.
#[derive(Debug)]
pub struct Accountant<S, C> {
    store: S,
    clock: C,
    session: Option<ActiveSession>,
    carry: DomainTotals,
}

impl<S: TotalsStore, C: Clock> Accountant<S, C> {
    /// Creates an idle accountant.
    pub fn new(store: S, clock: C) -> Self {
        Self {
            store,
            clock,
            session: None,
            carry: DomainTotals::new(),
        }
    }

    pub const fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn active_domain(&self) -> Option<&DomainId> {
        self.session.as_ref().map(|s| &s.domain)
    }

    /// Seconds whose flush failed and that are waiting for the next write.
    pub const fn carry_over(&self) -> &DomainTotals {
        &self.carry
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Reads the persisted totals.
    pub fn totals(&self) -> Result<DomainTotals, AccountError> {
        self.store.load().map_err(AccountError::Load)
    }

    /// Flushes time accrued by the active session up to now.
    ///
    /// On a store failure the session start is left untouched, so the same
    /// interval is recomputed by the next attempt.
    pub fn commit(&mut self) -> Result<Commit, AccountError> {
        let now = self.clock.now();
        self.commit_at(now)
    }

    /// Makes `domain` the active domain, or goes idle on `None`.
    ///
    /// Time accrued by the previous session is flushed first, with a single
    /// clock reading serving as both the cutoff and the new session start. The
    /// switch always takes effect; a flush failure is returned after the
    /// unflushed seconds have been parked in the carry-over ledger. When the
    /// previous session had nothing to write, any parked seconds are written
    /// instead.
    pub fn switch_to(&mut self, domain: Option<DomainId>) -> Result<(), AccountError> {
        let now = self.clock.now();
        let flushed = match self.commit_at(now) {
            Ok(Commit::Flushed { .. }) => Ok(()),
            Ok(Commit::Idle | Commit::Truncated) => self.flush_carry(),
            Err(e) => {
                self.park(now);
                Err(e)
            }
        };

        if let Err(e) = &flushed {
            tracing::warn!(
                error = %e,
                carried = self.carry.total_seconds(),
                "flush failed, carrying time over to next write"
            );
        }

        match (&self.session, &domain) {
            (Some(prev), Some(next)) if prev.domain == *next => {
                tracing::trace!(domain = %next, "session restarted");
            }
            (prev, next) => {
                tracing::debug!(
                    from = prev.as_ref().map(|s| s.domain.as_str()),
                    to = next.as_ref().map(DomainId::as_str),
                    "active domain changed"
                );
            }
        }

        self.session = domain.map(|domain| ActiveSession { domain, since: now });
        flushed
    }

    /// Re-establishes the session after a process start or wake-up.
    ///
    /// Whatever was active before the restart and not yet flushed is gone; the
    /// browser is asked what is active now and tracking resumes from this
    /// instant.
    pub fn initialize<B: Browser + ?Sized>(&mut self, browser: &B) -> Result<(), AccountError> {
        let domain = active_domain(browser);
        tracing::info!(
            domain = domain.as_ref().map(DomainId::as_str),
            "initializing active domain"
        );
        self.switch_to(domain)
    }

    fn commit_at(&mut self, now: DateTime<Utc>) -> Result<Commit, AccountError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(Commit::Idle);
        };

        let Some(seconds) = elapsed_seconds(session.since, now) else {
            tracing::trace!(domain = %session.domain, "no whole second elapsed");
            session.since = now;
            return Ok(Commit::Truncated);
        };

        let mut totals = self.store.load().map_err(AccountError::Load)?;
        totals.merge(&self.carry);
        totals.add(&session.domain, seconds);
        self.store.save(&totals).map_err(AccountError::Save)?;

        if !self.carry.is_empty() {
            tracing::info!(
                seconds = self.carry.total_seconds(),
                "flushed carried-over time"
            );
            self.carry.clear();
        }
        session.since = now;

        tracing::debug!(
            domain = %session.domain,
            seconds,
            total = totals.get(&session.domain),
            "committed active time"
        );
        Ok(Commit::Flushed {
            domain: session.domain.clone(),
            seconds,
        })
    }

    /// Writes parked seconds on their own. The ledger is kept on failure.
    fn flush_carry(&mut self) -> Result<(), AccountError> {
        if self.carry.is_empty() {
            return Ok(());
        }

        let mut totals = self.store.load().map_err(AccountError::Load)?;
        totals.merge(&self.carry);
        self.store.save(&totals).map_err(AccountError::Save)?;

        tracing::info!(
            seconds = self.carry.total_seconds(),
            "flushed carried-over time"
        );
        self.carry.clear();
        Ok(())
    }

    /// Moves the active session's unflushed seconds into the carry-over.
    fn park(&mut self, now: DateTime<Utc>) {
        let Some(session) = &self.session else {
            return;
        };
        if let Some(seconds) = elapsed_seconds(session.since, now) {
            self.carry.add(&session.domain, seconds);
        }
    }
}

/// Whole seconds between `since` and `now`, or `None` when not positive.
fn elapsed_seconds(since: DateTime<Utc>, now: DateTime<Utc>) -> Option<u64> {
    let seconds = (now - since).num_milliseconds().div_euclid(1000);
    u64::try_from(seconds).ok().filter(|s| *s > 0)
}
