//! The interactive console.
//!
//! Lines come from a blocking [`LineReader`] run on tokio's blocking pool.
//! Output produced meanwhile goes through the reader's external printer,
//! which prints above the prompt and redraws the pending input.

use std::io::{self, BufRead, IsTerminal, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use rustyline::error::ReadlineError;
use rustyline::{DefaultEditor, ExternalPrinter};

use super::commands::Dispatcher;
use super::output::{OutputRouter, OutputSink};
use super::tokenizer::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Idle,
    Processing,
    Closed,
}

/// Blocking source of console lines.
///
/// A reader that switches the terminal mode must restore it before
/// `read_line` returns.
pub trait LineReader: Send {
    /// `Eof` and `Interrupted` close the console.
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String>;

    fn add_history(&mut self, _line: &str) {}
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> rustyline::Result<String> {
        self.readline(prompt)
    }

    fn add_history(&mut self, line: &str) {
        let _ = self.add_history_entry(line);
    }
}

/// Plain lines from a non-interactive stdin, without prompt or echo.
pub struct StdinReader;

impl LineReader for StdinReader {
    fn read_line(&mut self, _prompt: &str) -> rustyline::Result<String> {
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Err(ReadlineError::Eof);
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}

/// Printer for consoles without a line editor: writes straight through.
pub struct WritePrinter<W>(pub W);

impl<W: Write + Send> ExternalPrinter for WritePrinter<W> {
    fn print(&mut self, msg: String) -> rustyline::Result<()> {
        self.0.write_all(msg.as_bytes())?;
        self.0.flush()?;
        Ok(())
    }
}

/// Where console lines come from and how output reaches the screen while a
/// line is being read.
pub struct ConsoleIo {
    pub reader: Box<dyn LineReader>,
    pub printer: Box<dyn ExternalPrinter + Send>,
}

impl ConsoleIo {
    pub fn new(
        reader: impl LineReader + 'static,
        printer: impl ExternalPrinter + Send + 'static,
    ) -> Self {
        Self {
            reader: Box::new(reader),
            printer: Box::new(printer),
        }
    }

    /// A rustyline editor on the controlling terminal.
    pub fn terminal() -> rustyline::Result<Self> {
        let mut editor = DefaultEditor::new()?;
        let printer = editor.create_external_printer()?;
        Ok(Self::new(editor, printer))
    }

    pub fn piped() -> Self {
        Self::new(StdinReader, WritePrinter(io::stdout()))
    }

    /// Use the line editor when attached to a terminal, plain lines otherwise.
    pub fn detect() -> Self {
        if io::stdin().is_terminal() && io::stdout().is_terminal() {
            match Self::terminal() {
                Ok(console) => return console,
                Err(e) => tracing::warn!("Line editor unavailable, reading plain lines: {}", e),
            }
        }
        Self::piped()
    }
}

struct Screen {
    printer: Box<dyn ExternalPrinter + Send>,
    state: ConsoleState,
}

/// Output sink that prints through the console's external printer.
pub struct ConsoleSink {
    screen: Mutex<Screen>,
}

impl ConsoleSink {
    pub fn new(printer: Box<dyn ExternalPrinter + Send>) -> Self {
        Self {
            screen: Mutex::new(Screen {
                printer,
                state: ConsoleState::Idle,
            }),
        }
    }

    fn screen(&self) -> MutexGuard<'_, Screen> {
        self.screen.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn state(&self) -> ConsoleState {
        self.screen().state
    }

    fn set_state(&self, state: ConsoleState) {
        self.screen().state = state;
    }
}

impl OutputSink for ConsoleSink {
    fn log(&self, message: &str) {
        let mut screen = self.screen();
        if screen.state == ConsoleState::Closed {
            return;
        }
        let mut text = message.to_string();
        if !text.ends_with('\n') {
            text.push('\n');
        }
        // Reporting here would loop back into this sink.
        let _ = screen.printer.print(text);
    }
}

/// Prompt loop bound to one session's directory.
pub struct Console {
    prompt: String,
    sink: Arc<ConsoleSink>,
    router: Arc<OutputRouter>,
    dispatcher: Dispatcher,
}

impl Console {
    /// `dispatcher` should print through `router`, so its output reaches
    /// `printer` once the console is attached.
    pub fn new(
        prompt: impl Into<String>,
        printer: Box<dyn ExternalPrinter + Send>,
        router: Arc<OutputRouter>,
        dispatcher: Dispatcher,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            sink: Arc::new(ConsoleSink::new(printer)),
            router,
            dispatcher,
        }
    }

    pub fn state(&self) -> ConsoleState {
        self.sink.state()
    }

    /// Run until end of input. Output is routed through the console for the
    /// whole run and handed back to the previous sink on return. The reader
    /// has released the terminal by the time `Bye!` is printed.
    pub async fn run(&self, mut reader: Box<dyn LineReader>) {
        let previous = self.router.attach(self.sink.clone());

        loop {
            self.sink.set_state(ConsoleState::Idle);
            let prompt = self.prompt.clone();
            let read = tokio::task::spawn_blocking(move || {
                let line = reader.read_line(&prompt);
                (reader, line)
            })
            .await;

            let line = match read {
                Ok((back, line)) => {
                    reader = back;
                    line
                }
                Err(e) => {
                    tracing::error!("Console reader stopped: {}", e);
                    break;
                }
            };

            match line {
                Ok(line) => {
                    self.sink.set_state(ConsoleState::Processing);
                    if !line.trim().is_empty() {
                        reader.add_history(&line);
                    }
                    self.process(&line).await;
                }
                Err(ReadlineError::Eof | ReadlineError::Interrupted) => break,
                Err(e) => {
                    tracing::warn!("Console input failed: {}", e);
                    break;
                }
            }
        }

        self.sink.set_state(ConsoleState::Closed);
        self.router.attach(previous);
        self.router.log("Bye!");
    }

    /// Tokenize and dispatch one line.
    pub async fn process(&self, line: &str) {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            return;
        }
        tracing::debug!("Console line: {:?}", line);
        self.dispatcher.execute(&tokens).await;
    }
}
