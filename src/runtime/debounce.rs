//! Debounced scheduling driven by the host's own clock.
//!
//! The map is single threaded, so there is no background timer: each
//! [`Debouncer`] remembers a deadline and the host calls [`Debouncer::poll`]
//! on every frame. A new trigger always supersedes the pending one.

use crate::prelude::{Duration, Instant};

/// Which edge of a burst fires the action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Edge {
    /// Fire once, `window` after the last trigger of a burst
    #[default]
    Trailing,
    /// Fire on the first trigger, then once more at the end of the burst
    Leading,
}

/// Timer state for one debounced action
#[derive(Debug, Clone)]
pub struct Debouncer<A> {
    window: Duration,
    edge: Edge,
    deadline: Option<Instant>,
    lock_until: Option<Instant>,
    pending: Option<A>,
}

impl<A> Debouncer<A> {
    pub fn new(window: Duration, edge: Edge) -> Self {
        Self {
            window,
            edge,
            deadline: None,
            lock_until: None,
            pending: None,
        }
    }

    pub fn trailing(window: Duration) -> Self {
        Self::new(window, Edge::Trailing)
    }

    pub fn leading(window: Duration) -> Self {
        Self::new(window, Edge::Leading)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn edge(&self) -> Edge {
        self.edge
    }

    /// Registers a trigger at `now`.
    ///
    /// Returns `Some(args)` when the action has to run right away (leading
    /// edge of a new burst). Otherwise the arguments are kept, replacing any
    /// older pending ones, until [`poll`](Self::poll) releases them.
    pub fn trigger(&mut self, now: Instant, args: A) -> Option<A> {
        match self.edge {
            Edge::Trailing => {
                self.pending = Some(args);
                self.deadline = Some(now + self.window);
                None
            }
            Edge::Leading => {
                let locked = self.lock_until.is_some_and(|lock| now < lock);
                if !locked && self.pending.is_none() {
                    self.lock_until = Some(now + self.window);
                    Some(args)
                } else {
                    self.pending = Some(args);
                    self.deadline = Some(self.lock_until.unwrap_or(now).max(now));
                    None
                }
            }
        }
    }

    /// Releases the pending arguments once the deadline has been reached
    pub fn poll(&mut self, now: Instant) -> Option<A> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }

    /// Drops the pending invocation, if any
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

/// A [`Debouncer`] bundled with the action it guards
pub struct Debounced<A, F>
where
    F: FnMut(A),
{
    timer: Debouncer<A>,
    action: F,
}

impl<A, F> Debounced<A, F>
where
    F: FnMut(A),
{
    pub fn new(action: F, window: Duration, edge: Edge) -> Self {
        Self {
            timer: Debouncer::new(window, edge),
            action,
        }
    }

    /// Triggers the action, running it immediately on a leading edge
    pub fn trigger(&mut self, now: Instant, args: A) {
        if let Some(args) = self.timer.trigger(now, args) {
            (self.action)(args);
        }
    }

    /// Runs the pending action if it is due. Returns whether it ran.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.timer.poll(now) {
            Some(args) => {
                (self.action)(args);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.timer.is_pending()
    }

    pub fn cancel(&mut self) {
        self.timer.cancel();
    }
}
