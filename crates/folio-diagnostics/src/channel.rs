//! Unbounded multi-producer diagnostics queue.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use crate::Diagnostic;

/// Message carried by the channel.
pub(crate) enum Event {
    Diagnostic(Diagnostic),
    /// Wakes the consumer so it re-checks the completion and cancellation flags.
    Wake,
}

/// Unbounded queue of diagnostics with a single consumer.
///
/// Writers never block and writes are never refused. The queue tracks two
/// signals: completion (no more diagnostics are expected) and cancellation
/// (the consumer should stop waiting). Completing the channel also cancels it,
/// after which the consumer performs one final drain.
pub struct DiagnosticsChannel {
    sender: mpsc::Sender<Event>,
    receiver: Mutex<Option<mpsc::Receiver<Event>>>,
    completed: AtomicBool,
    cancelled: AtomicBool,
}

impl DiagnosticsChannel {
    /// Create an open channel.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Mutex::new(Some(receiver)),
            completed: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Queue a diagnostic.
    ///
    /// Safe to call from any number of threads. Diagnostics written after
    /// the consumer has shut down are logged instead of queued.
    pub fn write(&self, diagnostic: Diagnostic) {
        if let Err(mpsc::SendError(Event::Diagnostic(late))) =
            self.sender.send(Event::Diagnostic(diagnostic))
        {
            tracing::warn!(
                file = %late.file,
                severity = %late.severity,
                message = %late.message,
                "Diagnostic written after collection finished"
            );
        }
    }

    /// Signal that no further diagnostics are expected.
    ///
    /// Idempotent. Also cancels the channel so the consumer stops waiting.
    pub fn complete(&self) {
        if !self.completed.swap(true, Ordering::SeqCst) {
            self.cancelled.store(true, Ordering::SeqCst);
            let _ = self.sender.send(Event::Wake);
        }
    }

    /// Cancel the channel without completing it.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            let _ = self.sender.send(Event::Wake);
        }
    }

    /// Whether [`complete`](Self::complete) was called.
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }

    /// Whether the channel was cancelled or completed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Take the receiving end. Only the first caller gets it.
    pub(crate) fn take_receiver(&self) -> Option<mpsc::Receiver<Event>> {
        self.receiver.lock().unwrap().take()
    }
}

impl Default for DiagnosticsChannel {
    fn default() -> Self {
        Self::new()
    }
}
