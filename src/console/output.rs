//! Output sinks.
//!
//! Every component prints through an [`OutputSink`]. Before a console is
//! attached the [`OutputRouter`] forwards to stdout; once attached, writes
//! go through the console so the prompt survives background output.

use std::io::{self, Write};
use std::sync::{Arc, RwLock};

use tracing_subscriber::fmt::MakeWriter;

pub trait OutputSink: Send + Sync {
    /// Print one message. Multi-line messages are printed as one unit.
    fn log(&self, message: &str);
}

/// Writes straight to stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl OutputSink for StdoutSink {
    fn log(&self, message: &str) {
        let mut stdout = io::stdout().lock();
        let _ = writeln!(stdout, "{}", message);
        let _ = stdout.flush();
    }
}

/// Forwards to whichever sink is currently attached.
pub struct OutputRouter {
    current: RwLock<Arc<dyn OutputSink>>,
}

impl OutputRouter {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(StdoutSink)),
        }
    }

    /// Route all output through `sink`. Returns the sink it replaces, so the
    /// caller can hand output back when done.
    pub fn attach(&self, sink: Arc<dyn OutputSink>) -> Arc<dyn OutputSink> {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, sink)
    }

    fn current(&self) -> Arc<dyn OutputSink> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for OutputRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for OutputRouter {
    fn log(&self, message: &str) {
        self.current().log(message);
    }
}

/// Lets the tracing console layer print through the router.
#[derive(Clone)]
pub struct RouterWriter {
    router: Arc<OutputRouter>,
}

impl RouterWriter {
    pub fn new(router: Arc<OutputRouter>) -> Self {
        Self { router }
    }
}

impl<'a> MakeWriter<'a> for RouterWriter {
    type Writer = EventWriter;

    fn make_writer(&'a self) -> Self::Writer {
        EventWriter {
            sink: self.router.current(),
            buf: Vec::new(),
        }
    }
}

/// Buffers one formatted tracing event and logs it when dropped.
pub struct EventWriter {
    sink: Arc<dyn OutputSink>,
    buf: Vec<u8>,
}

impl Write for EventWriter {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        let text = String::from_utf8_lossy(&self.buf);
        let text = text.trim_end();
        if !text.is_empty() {
            self.sink.log(text);
        }
    }
}

/// Collects everything logged; used by tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: std::sync::Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Everything logged so far, one message per line.
    pub fn text(&self) -> String {
        self.lines().join("\n")
    }
}

impl OutputSink for MemorySink {
    fn log(&self, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_router_switches_sinks() {
        let router = OutputRouter::new();
        let first = Arc::new(MemorySink::new());
        let second = Arc::new(MemorySink::new());

        router.attach(first.clone());
        router.log("one");
        let previous = router.attach(second.clone());
        router.log("two");
        router.attach(previous);
        router.log("three");

        assert_eq!(first.lines(), vec!["one", "three"]);
        assert_eq!(second.lines(), vec!["two"]);
    }

    #[test]
    fn test_event_writer_logs_on_drop() {
        let router = Arc::new(OutputRouter::new());
        let sink = Arc::new(MemorySink::new());
        router.attach(sink.clone());

        let make = RouterWriter::new(router);
        {
            let mut writer = make.make_writer();
            write!(writer, "WARN chatdeck: ").unwrap();
            writeln!(writer, "poll failed").unwrap();
        }

        assert_eq!(sink.lines(), vec!["WARN chatdeck: poll failed"]);
    }
}
