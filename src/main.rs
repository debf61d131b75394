//! chatdeck - several messaging bot sessions, one interactive console.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use chatdeck::console::OutputRouter;
use chatdeck::{logging, Commands};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let router = Arc::new(OutputRouter::new());

    // Initialize logging; the guard flushes the file writer on exit.
    let _guard = match logging::init(router.clone()) {
        Ok((guard, _)) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Parse command line arguments
    let args = Commands::parse();

    // Run the command
    match args.run(router).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
