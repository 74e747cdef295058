//! Diagnostic sinks.

use std::io::Write;
use std::path::PathBuf;

use crate::{Diagnostic, Severity};

/// Receives every collected diagnostic, in arrival order, on the consumer thread.
pub trait DiagnosticsOutput: Send {
    /// Handle one diagnostic.
    fn write(&mut self, diagnostic: &Diagnostic);

    /// Called once after the last diagnostic.
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Logs diagnostics through `tracing`.
#[derive(Debug, Default)]
pub struct LogOutput;

impl DiagnosticsOutput for LogOutput {
    fn write(&mut self, diagnostic: &Diagnostic) {
        let line = diagnostic.line.unwrap_or_default();
        match diagnostic.severity {
            Severity::Error => {
                tracing::error!(file = %diagnostic.file, line, "{}", diagnostic.message);
            }
            Severity::Warning => {
                tracing::warn!(file = %diagnostic.file, line, "{}", diagnostic.message);
            }
        }
    }
}

/// Writes GitHub Actions workflow commands so diagnostics show up as
/// annotations on pull requests.
pub struct GithubAnnotationOutput {
    writer: Box<dyn Write + Send>,
}

impl GithubAnnotationOutput {
    /// Create an output writing workflow commands to `writer`.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }

    /// Create a stdout output when running inside GitHub Actions.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        std::env::var("GITHUB_ACTIONS")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(|_| Self::new(Box::new(std::io::stdout())))
    }

    fn command(diagnostic: &Diagnostic) -> String {
        let kind = match diagnostic.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let mut properties = vec![format!("file={}", escape_property(&diagnostic.file))];
        if let Some(line) = diagnostic.line {
            properties.push(format!("line={line}"));
        }
        if let Some(column) = diagnostic.column {
            properties.push(format!("col={column}"));
            properties.push(format!(
                "endColumn={}",
                column + diagnostic.length.unwrap_or(1)
            ));
        }
        format!(
            "::{kind} {}::{}",
            properties.join(","),
            escape_data(&diagnostic.message)
        )
    }
}

fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

impl DiagnosticsOutput for GithubAnnotationOutput {
    fn write(&mut self, diagnostic: &Diagnostic) {
        if let Err(e) = writeln!(self.writer, "{}", Self::command(diagnostic)) {
            tracing::warn!(error = %e, "Failed to write GitHub annotation");
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Buffers diagnostics and writes them as a JSON array on flush.
#[derive(Debug)]
pub struct ReportOutput {
    path: PathBuf,
    items: Vec<Diagnostic>,
}

impl ReportOutput {
    /// Create a report written to `path`.
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            items: Vec::new(),
        }
    }
}

impl DiagnosticsOutput for ReportOutput {
    fn write(&mut self, diagnostic: &Diagnostic) {
        self.items.push(diagnostic.clone());
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.items)?;
        std::fs::write(&self.path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use pretty_assertions::assert_eq;

    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_github_annotation_with_position() {
        let buffer = SharedBuffer::default();
        let mut output = GithubAnnotationOutput::new(Box::new(buffer.clone()));

        output.write(
            &Diagnostic::error("docs/a.md", "Bad link\nsecond line")
                .with_position(4, 2)
                .with_length(5),
        );

        let text = String::from_utf8(buffer.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            text,
            "::error file=docs/a.md,line=4,col=2,endColumn=7::Bad link%0Asecond line\n"
        );
    }

    #[test]
    fn test_github_annotation_warning_without_position() {
        let d = Diagnostic::warning("a,b.md", "100% sure");
        assert_eq!(
            GithubAnnotationOutput::command(&d),
            "::warning file=a%2Cb.md::100%25 sure"
        );
    }

    #[test]
    fn test_report_output_writes_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/diagnostics.json");
        let mut output = ReportOutput::new(path.clone());

        output.write(&Diagnostic::error("a.md", "one"));
        output.write(&Diagnostic::warning("b.md", "two"));
        output.flush().unwrap();

        let items: Vec<Diagnostic> =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].severity, Severity::Warning);
    }
}
