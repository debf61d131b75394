//! Interactive console: tokenizer, commands, output sinks and the prompt loop.

pub mod commands;
pub mod output;
pub mod repl;
pub mod table;
pub mod tokenizer;

pub use commands::{Command, CommandContext, Dispatcher};
pub use output::{MemorySink, OutputRouter, OutputSink, RouterWriter, StdoutSink};
pub use repl::{Console, ConsoleIo, ConsoleSink, ConsoleState, LineReader, StdinReader, WritePrinter};
pub use tokenizer::{tokenize, Token};
