//! Background consumer that aggregates diagnostics.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::channel::Event;
use crate::{Diagnostic, DiagnosticsChannel, DiagnosticsOutput, Severity};

/// Aggregated result of a collection run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiagnosticsSummary {
    /// Number of errors.
    pub errors: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Distinct files that reported at least one diagnostic.
    pub offending_files: BTreeSet<String>,
    /// Every diagnostic in arrival order.
    pub diagnostics: Vec<Diagnostic>,
}

impl DiagnosticsSummary {
    /// Whether any error was reported.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

#[derive(Default)]
struct LiveCounts {
    errors: AtomicUsize,
    warnings: AtomicUsize,
}

/// State owned by the consumer thread.
struct Consumer {
    receiver: Receiver<Event>,
    outputs: Vec<Box<dyn DiagnosticsOutput>>,
    summary: DiagnosticsSummary,
    live: Arc<LiveCounts>,
}

impl Consumer {
    fn run(mut self, channel: &DiagnosticsChannel) -> Self {
        while !channel.is_cancelled() {
            match self.receiver.recv() {
                Ok(Event::Diagnostic(diagnostic)) => self.handle(diagnostic),
                Ok(Event::Wake) => {}
                Err(_) => break,
            }
        }
        self.drain();
        self
    }

    fn drain(&mut self) {
        while let Ok(event) = self.receiver.try_recv() {
            if let Event::Diagnostic(diagnostic) = event {
                self.handle(diagnostic);
            }
        }
    }

    fn handle(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Error => {
                self.summary.errors += 1;
                self.live.errors.fetch_add(1, Ordering::Relaxed);
            }
            Severity::Warning => {
                self.summary.warnings += 1;
                self.live.warnings.fetch_add(1, Ordering::Relaxed);
            }
        }
        if !self.summary.offending_files.contains(&diagnostic.file) {
            self.summary
                .offending_files
                .insert(diagnostic.file.clone());
        }
        for output in &mut self.outputs {
            output.write(&diagnostic);
        }
        self.summary.diagnostics.push(diagnostic);
    }

    fn finish(mut self) -> DiagnosticsSummary {
        for output in &mut self.outputs {
            if let Err(e) = output.flush() {
                tracing::error!(error = %e, "Failed to flush diagnostics output");
            }
        }
        self.summary
    }
}

enum ConsumerSlot {
    Idle(Vec<Box<dyn DiagnosticsOutput>>),
    Running(JoinHandle<Consumer>),
    Stopped(DiagnosticsSummary),
}

/// Collects diagnostics from any number of producer threads.
///
/// A single background thread, spawned by [`start`](Self::start), owns the
/// counters and the offending-files set. [`stop`](Self::stop) completes the
/// channel, joins the consumer and returns the final [`DiagnosticsSummary`].
/// Cross-links are recorded directly by producers into a shared set.
pub struct DiagnosticsCollector {
    channel: Arc<DiagnosticsChannel>,
    slot: Mutex<ConsumerSlot>,
    live: Arc<LiveCounts>,
    cross_links: Mutex<BTreeSet<String>>,
}

impl DiagnosticsCollector {
    /// Create a collector forwarding every diagnostic to `outputs`.
    #[must_use]
    pub fn new(outputs: Vec<Box<dyn DiagnosticsOutput>>) -> Self {
        Self {
            channel: Arc::new(DiagnosticsChannel::new()),
            slot: Mutex::new(ConsumerSlot::Idle(outputs)),
            live: Arc::new(LiveCounts::default()),
            cross_links: Mutex::new(BTreeSet::new()),
        }
    }

    /// The underlying channel.
    #[must_use]
    pub fn channel(&self) -> &DiagnosticsChannel {
        &self.channel
    }

    /// Spawn the consumer thread. Subsequent calls are no-ops.
    pub fn start(&self) {
        let mut slot = self.slot.lock().unwrap();
        let ConsumerSlot::Idle(outputs) = &mut *slot else {
            return;
        };
        let Some(receiver) = self.channel.take_receiver() else {
            return;
        };
        let consumer = Consumer {
            receiver,
            outputs: std::mem::take(outputs),
            summary: DiagnosticsSummary::default(),
            live: Arc::clone(&self.live),
        };
        let channel = Arc::clone(&self.channel);
        let handle = std::thread::spawn(move || consumer.run(&channel));
        *slot = ConsumerSlot::Running(handle);
        tracing::debug!("Diagnostics collector started");
    }

    /// Complete the channel, wait for the consumer and return the summary.
    ///
    /// Starts the consumer first if needed. Calling `stop` again returns the
    /// same summary.
    pub fn stop(&self) -> DiagnosticsSummary {
        self.start();
        self.channel.complete();

        let mut slot = self.slot.lock().unwrap();
        let summary = match std::mem::replace(&mut *slot, ConsumerSlot::Idle(Vec::new())) {
            ConsumerSlot::Running(handle) => match handle.join() {
                Ok(mut consumer) => {
                    // Diagnostics racing with `complete` may land after the final drain.
                    consumer.drain();
                    consumer.finish()
                }
                Err(_) => {
                    tracing::error!("Diagnostics consumer panicked");
                    DiagnosticsSummary {
                        errors: self.errors(),
                        warnings: self.warnings(),
                        ..DiagnosticsSummary::default()
                    }
                }
            },
            ConsumerSlot::Stopped(summary) => summary,
            ConsumerSlot::Idle(_) => DiagnosticsSummary::default(),
        };
        *slot = ConsumerSlot::Stopped(summary.clone());

        tracing::debug!(
            errors = summary.errors,
            warnings = summary.warnings,
            "Diagnostics collector stopped"
        );
        summary
    }

    /// Errors counted so far.
    #[must_use]
    pub fn errors(&self) -> usize {
        self.live.errors.load(Ordering::Relaxed)
    }

    /// Warnings counted so far.
    #[must_use]
    pub fn warnings(&self) -> usize {
        self.live.warnings.load(Ordering::Relaxed)
    }

    /// Queue a diagnostic.
    pub fn emit(&self, diagnostic: Diagnostic) {
        self.channel.write(diagnostic);
    }

    /// Queue an error without position.
    pub fn emit_error(&self, file: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::error(file, message));
    }

    /// Queue a warning without position.
    pub fn emit_warning(&self, file: impl Into<String>, message: impl Into<String>) {
        self.emit(Diagnostic::warning(file, message));
    }

    /// Queue an error whose message is followed by the error and its sources.
    pub fn emit_error_with_source(
        &self,
        file: impl Into<String>,
        message: &str,
        error: &dyn std::error::Error,
    ) {
        let mut full = format!("{message}\n{error}");
        let mut source = error.source();
        while let Some(cause) = source {
            full.push('\n');
            full.push_str(&cause.to_string());
            source = cause.source();
        }
        self.emit(Diagnostic::error(file, full));
    }

    /// Record a link into another documentation set.
    pub fn emit_cross_link(&self, link: impl Into<String>) {
        self.cross_links.lock().unwrap().insert(link.into());
    }

    /// Recorded cross-links, deduplicated and sorted.
    #[must_use]
    pub fn cross_links(&self) -> Vec<String> {
        self.cross_links.lock().unwrap().iter().cloned().collect()
    }
}

impl Drop for DiagnosticsCollector {
    fn drop(&mut self) {
        self.channel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    static_assertions::assert_impl_all!(DiagnosticsCollector: Send, Sync);

    struct Recording(Arc<Mutex<Vec<String>>>);

    impl DiagnosticsOutput for Recording {
        fn write(&mut self, diagnostic: &Diagnostic) {
            self.0.lock().unwrap().push(diagnostic.message.clone());
        }
    }

    #[test]
    fn test_parallel_producers_are_counted_exactly() {
        let collector = DiagnosticsCollector::new(Vec::new());
        collector.start();

        std::thread::scope(|scope| {
            for producer in 0..16 {
                let collector = &collector;
                scope.spawn(move || {
                    for i in 0..50 {
                        let file = format!("p{producer}/f{}.md", i % 5);
                        if i % 2 == 0 {
                            collector.emit_error(file, "error");
                        } else {
                            collector.emit_warning(file, "warning");
                        }
                    }
                });
            }
        });

        let summary = collector.stop();

        assert_eq!(summary.errors, 16 * 25);
        assert_eq!(summary.warnings, 16 * 25);
        assert_eq!(summary.diagnostics.len(), 16 * 50);
        assert_eq!(summary.offending_files.len(), 16 * 5);
        assert!(summary.offending_files.contains("p15/f4.md"));
    }

    #[test]
    fn test_stop_without_start_drains() {
        let collector = DiagnosticsCollector::new(Vec::new());
        collector.emit_error("a.md", "queued before start");

        let summary = collector.stop();

        assert_eq!(summary.errors, 1);
        assert_eq!(
            summary.offending_files.into_iter().collect::<Vec<_>>(),
            vec!["a.md"]
        );
    }

    #[test]
    fn test_write_after_complete_is_not_lost() {
        let collector = DiagnosticsCollector::new(Vec::new());
        collector.start();
        collector.channel().complete();
        collector.emit_warning("late.md", "after complete");

        let summary = collector.stop();

        assert_eq!(summary.warnings, 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let collector = DiagnosticsCollector::new(Vec::new());
        collector.start();
        collector.start();
        collector.emit_error("a.md", "one");

        let first = collector.stop();
        let second = collector.stop();

        assert_eq!(first, second);
        assert_eq!(collector.errors(), 1);
    }

    #[test]
    fn test_outputs_receive_in_arrival_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let collector = DiagnosticsCollector::new(vec![Box::new(Recording(Arc::clone(&seen)))]);
        collector.start();
        collector.emit_error("a.md", "first");
        collector.emit_warning("a.md", "second");
        collector.emit_error("b.md", "third");

        collector.stop();

        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_cross_links_are_deduplicated() {
        let collector = DiagnosticsCollector::new(Vec::new());
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    collector.emit_cross_link("kibana://b.md");
                    collector.emit_cross_link("kibana://a.md");
                });
            }
        });

        assert_eq!(
            collector.cross_links(),
            vec!["kibana://a.md", "kibana://b.md"]
        );
    }

    #[test]
    fn test_error_with_source_appends_message() {
        let collector = DiagnosticsCollector::new(Vec::new());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing file");
        collector.emit_error_with_source("a.md", "Failed to read", &io);

        let summary = collector.stop();

        assert_eq!(summary.diagnostics[0].message, "Failed to read\nmissing file");
    }
}
