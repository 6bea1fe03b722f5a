//! Pending sign-in results.
//!
//! [`PendingResult`] is handed back to a caller immediately and filled in
//! later, from whichever thread the sign-in SDK happens to report on. A caller
//! can block on it, block with a deadline, or register a callback; all three
//! observe the same single completion.
//!
//! # Completion policy
//!
//! Completion (releasing the latch and notifying subscribers) happens exactly
//! once. The payload itself stays writable afterwards: a late `finalize` or
//! `cancel` replaces the status seen by later readers, but never re-notifies
//! subscribers and never downgrades a known account back to `None`.

use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::account::SignInAccount;
use crate::handle::RequestHandle;
use crate::status::StatusCode;

/// The payload of a pending result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenResult {
    pub handle: RequestHandle,
    pub status: StatusCode,
    pub account: Option<SignInAccount>,
}

impl TokenResult {
    /// A result nobody has written yet.
    pub fn unset(handle: RequestHandle) -> Self {
        Self {
            handle,
            status: StatusCode::default(),
            account: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

impl fmt::Display for TokenResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.account {
            Some(account) => write!(f, "{} status: {} account: {}", self.handle, self.status, account.user_id),
            None => write!(f, "{} status: {} account: <null>", self.handle, self.status),
        }
    }
}

/// Callback invoked once with the completed payload.
pub type ResultCallback = Box<dyn FnOnce(TokenResult) + Send + 'static>;

struct Shared {
    result: TokenResult,
    completed: bool,
    subscribers: Vec<ResultCallback>,
}

#[derive(Default)]
struct LatchState {
    released: bool,
    /// Bumped by `interrupt()`; a waiter that sees it move gives up.
    interrupts: u64,
}

/// One-shot latch that waiters park on.
#[derive(Default)]
struct Latch {
    state: Mutex<LatchState>,
    cond: Condvar,
}

impl Latch {
    fn release(&self) -> bool {
        let mut state = self.state.lock();
        if state.released {
            return false;
        }
        state.released = true;
        self.cond.notify_all();
        true
    }

    fn interrupt(&self) {
        let mut state = self.state.lock();
        state.interrupts = state.interrupts.wrapping_add(1);
        self.cond.notify_all();
    }
}

enum WaitOutcome {
    Released,
    TimedOut,
    Interrupted,
}

/// A single result that will be available later.
pub struct PendingResult {
    handle: RequestHandle,
    shared: Mutex<Shared>,
    latch: Latch,
}

impl PendingResult {
    pub fn new(handle: RequestHandle) -> Self {
        Self {
            handle,
            shared: Mutex::new(Shared {
                result: TokenResult::unset(handle),
                completed: false,
                subscribers: Vec::new(),
            }),
            latch: Latch::default(),
        }
    }

    pub fn handle(&self) -> RequestHandle {
        self.handle
    }

    /// Snapshot of the current payload.
    pub fn result(&self) -> TokenResult {
        self.shared.lock().result.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.shared.lock().completed
    }

    pub fn is_canceled(&self) -> bool {
        self.shared.lock().result.status.is_canceled()
    }

    /// Block until the result completes.
    ///
    /// If the wait is interrupted the payload is forced to
    /// [`StatusCode::Interrupted`] before returning.
    pub fn wait(&self) -> TokenResult {
        match self.park(None) {
            WaitOutcome::Released | WaitOutcome::TimedOut => {}
            WaitOutcome::Interrupted => self.mark_unfinished(StatusCode::Interrupted),
        }
        self.result()
    }

    /// Block for at most `timeout`.
    ///
    /// On expiry the payload is forced to [`StatusCode::Timeout`]. The
    /// underlying operation keeps running and may still complete later.
    pub fn wait_timeout(&self, timeout: Duration) -> TokenResult {
        match self.park(Some(Instant::now() + timeout)) {
            WaitOutcome::Released => {}
            WaitOutcome::TimedOut => {
                debug!(handle = %self.handle, ?timeout, "Wait for result timed out");
                self.mark_unfinished(StatusCode::Timeout);
            }
            WaitOutcome::Interrupted => self.mark_unfinished(StatusCode::Interrupted),
        }
        self.result()
    }

    /// Wait until completion from async code.
    pub async fn wait_async(&self) -> TokenResult {
        let (tx, rx) = tokio::sync::oneshot::channel();
        self.register(move |result| {
            let _ = tx.send(result);
        });
        match rx.await {
            Ok(result) => result,
            Err(_) => self.result(),
        }
    }

    /// Wake every thread blocked in `wait`/`wait_timeout`.
    ///
    /// Each woken waiter returns an `Interrupted` payload. The latch stays
    /// closed, so the real completion can still arrive afterwards.
    pub fn interrupt(&self) {
        self.latch.interrupt();
    }

    /// Force a `Canceled` payload and complete immediately. Idempotent.
    pub fn cancel(&self) {
        self.complete_with(|result| {
            result.status = StatusCode::Canceled;
        });
    }

    /// Register a completion callback.
    ///
    /// If the result already completed, `callback` runs right away on the
    /// calling thread. Otherwise it runs exactly once on whichever thread
    /// performs the completing write.
    pub fn register<F>(&self, callback: F)
    where
        F: FnOnce(TokenResult) + Send + 'static,
    {
        let mut shared = self.shared.lock();
        if shared.completed {
            let result = shared.result.clone();
            drop(shared);
            callback(result);
        } else {
            shared.subscribers.push(Box::new(callback));
        }
    }

    /// Wait up to `timeout`, then hand the current payload to `callback`.
    pub fn register_with_timeout<F>(&self, callback: F, timeout: Duration)
    where
        F: FnOnce(TokenResult),
    {
        let result = self.wait_timeout(timeout);
        callback(result);
    }

    /// Replace the payload without completing.
    ///
    /// A `None` account keeps whatever account was set before.
    pub fn set_payload(&self, account: Option<SignInAccount>, status: StatusCode) {
        let mut shared = self.shared.lock();
        shared.result.status = status;
        if account.is_some() {
            shared.result.account = account;
        }
    }

    /// Set the final status, release the latch and notify subscribers.
    pub fn finalize(&self, status: StatusCode) {
        self.complete_with(|result| {
            result.status = status;
        });
    }

    /// Record why a waiter gave up, unless a completion already landed.
    fn mark_unfinished(&self, status: StatusCode) {
        let mut shared = self.shared.lock();
        if !shared.completed {
            shared.result.status = status;
        }
    }

    fn complete_with(&self, update: impl FnOnce(&mut TokenResult)) {
        let (subscribers, result) = {
            let mut shared = self.shared.lock();
            update(&mut shared.result);
            if shared.completed {
                debug!(handle = %self.handle, status = %shared.result.status, "Result updated after completion");
                return;
            }
            shared.completed = true;
            (std::mem::take(&mut shared.subscribers), shared.result.clone())
        };

        self.latch.release();

        if !subscribers.is_empty() {
            debug!(handle = %self.handle, subscribers = subscribers.len(), result = %result, "Notifying result subscribers");
        }
        for callback in subscribers {
            callback(result.clone());
        }
    }

    fn park(&self, deadline: Option<Instant>) -> WaitOutcome {
        let mut latch = self.latch.state.lock();
        let seen = latch.interrupts;
        loop {
            if latch.released {
                return WaitOutcome::Released;
            }
            if latch.interrupts != seen {
                return WaitOutcome::Interrupted;
            }
            match deadline {
                Some(deadline) => {
                    if self.latch.cond.wait_until(&mut latch, deadline).timed_out() {
                        return if latch.released {
                            WaitOutcome::Released
                        } else {
                            WaitOutcome::TimedOut
                        };
                    }
                }
                None => self.latch.cond.wait(&mut latch),
            }
        }
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.shared.lock();
        f.debug_struct("PendingResult")
            .field("handle", &self.handle)
            .field("status", &shared.result.status)
            .field("completed", &shared.completed)
            .field("subscribers", &shared.subscribers.len())
            .finish()
    }
}
