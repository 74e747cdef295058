//! Build diagnostics for Folio.
//!
//! Errors and warnings are produced by many threads at once (tree building,
//! parallel page processing, link resolution) and consumed by a single
//! background thread that counts them, tracks the files that reported them,
//! and forwards each one to the registered [`DiagnosticsOutput`] sinks.
//!
//! # Architecture
//!
//! - [`DiagnosticsChannel`]: unbounded multi-producer queue with completion
//!   and cancellation signals
//! - [`DiagnosticsCollector`]: owns the consumer thread and the aggregated
//!   [`DiagnosticsSummary`]
//! - [`LogOutput`], [`GithubAnnotationOutput`], [`ReportOutput`]: sinks
//!
//! # Example
//!
//! ```
//! use folio_diagnostics::DiagnosticsCollector;
//!
//! let collector = DiagnosticsCollector::new(Vec::new());
//! collector.start();
//! collector.emit_error("guide.md", "broken link");
//! let summary = collector.stop();
//! assert_eq!(summary.errors, 1);
//! ```

mod channel;
mod collector;
mod diagnostic;
mod output;

pub use channel::DiagnosticsChannel;
pub use collector::{DiagnosticsCollector, DiagnosticsSummary};
pub use diagnostic::{Diagnostic, Severity};
pub use output::{DiagnosticsOutput, GithubAnnotationOutput, LogOutput, ReportOutput};
