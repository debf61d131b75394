//! CLI commands for chatdeck using clap.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use crate::config::{get_settings_path, load_settings, write_default_settings, Settings, Transport};
use crate::console::{table, ConsoleIo, OutputRouter, OutputSink};
use crate::session::orchestrator::ConsoleSetup;
use crate::session::{LocalSession, Orchestrator, Session};
use crate::telegram::TelegramSession;

/// chatdeck - run several bot sessions and drive one from a console.
#[derive(Parser)]
#[command(name = "chatdeck")]
#[command(version = "0.1.0")]
#[command(about = "chatdeck - several messaging sessions, one console", long_about = None)]
pub struct Commands {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start all sessions and attach the console to the primary one
    Run {
        /// Settings file (defaults to ~/.chatdeck/settings.json)
        #[arg(long, env = "CHATDECK_CONFIG")]
        config: Option<PathBuf>,

        /// Index of the primary session (overrides settings)
        #[arg(long)]
        primary: Option<usize>,

        /// Run without the interactive console
        #[arg(long, default_value_t = false)]
        no_console: bool,
    },

    /// Write a default settings file
    Setup {
        /// Settings file to write
        #[arg(long, env = "CHATDECK_CONFIG")]
        config: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// List configured sessions
    Sessions {
        /// Settings file (defaults to ~/.chatdeck/settings.json)
        #[arg(long, env = "CHATDECK_CONFIG")]
        config: Option<PathBuf>,
    },
}

impl Commands {
    /// Run the command. All user-facing output goes through `router`.
    pub async fn run(&self, router: Arc<OutputRouter>) -> Result<()> {
        match &self.command {
            Command::Run {
                config,
                primary,
                no_console,
            } => cmd_run(router, config.as_deref(), *primary, *no_console).await,
            Command::Setup { config, force } => cmd_setup(&*router, config.as_deref(), *force),
            Command::Sessions { config } => cmd_sessions(&*router, config.as_deref()),
        }
    }
}

/// Build one session per configured entry, in order.
pub fn build_sessions(settings: &Settings, cache_dir: &Path) -> Result<Vec<Arc<dyn Session>>> {
    let mut sessions: Vec<Arc<dyn Session>> = Vec::with_capacity(settings.sessions.len());
    for config in &settings.sessions {
        let session: Arc<dyn Session> = match &config.transport {
            Transport::Telegram { bot_token } => {
                Arc::new(TelegramSession::new(&config.id, bot_token, cache_dir)?)
            }
            Transport::Local {
                account,
                contacts,
                rooms,
            } => Arc::new(LocalSession::new(
                &config.id,
                account,
                contacts.clone(),
                rooms.clone(),
            )),
        };
        sessions.push(session);
    }
    Ok(sessions)
}

async fn cmd_run(
    router: Arc<OutputRouter>,
    config: Option<&Path>,
    primary: Option<usize>,
    no_console: bool,
) -> Result<()> {
    let settings = load_settings(config)?;
    let primary = primary.unwrap_or(settings.primary);
    let cache_dir = settings.ensure_cache_dir()?;
    let sessions = build_sessions(&settings, &cache_dir)?;

    let mut orchestrator = Orchestrator::new(
        sessions,
        primary,
        settings.trigger.compile()?,
        settings.trigger.reply.clone(),
        router.clone(),
    )?;
    if !no_console {
        orchestrator = orchestrator.with_console(ConsoleSetup {
            prompt: settings.console.prompt.clone(),
            io: ConsoleIo::detect(),
        });
    }
    let orchestrator = Arc::new(orchestrator);

    let started = orchestrator.start_all().await;
    if started == 0 {
        bail!("No session could be started");
    }

    if no_console {
        router.log("Running without console. Press Ctrl-C to stop.");
        tokio::signal::ctrl_c().await?;
        return Ok(());
    }

    tokio::select! {
        _ = orchestrator.console_closed() => {}
        signal = tokio::signal::ctrl_c() => signal?,
    }
    Ok(())
}

fn cmd_setup(out: &dyn OutputSink, config: Option<&Path>, force: bool) -> Result<()> {
    let path = match config {
        Some(path) => path.to_path_buf(),
        None => get_settings_path()?,
    };
    write_default_settings(&path, force)?;
    out.log(&format!("Wrote default settings to {}", path.display()));
    out.log("Edit it to add sessions, then start with: chatdeck run");
    Ok(())
}

fn cmd_sessions(out: &dyn OutputSink, config: Option<&Path>) -> Result<()> {
    let settings = load_settings(config)?;
    let rows: Vec<Vec<String>> = settings
        .sessions
        .iter()
        .enumerate()
        .map(|(i, session)| {
            let role = if i == settings.primary { "primary" } else { "secondary" };
            vec![
                i.to_string(),
                session.id.clone(),
                role.to_string(),
                session.transport.kind().to_string(),
            ]
        })
        .collect();
    out.log(&table::render(&["#", "id", "role", "transport"], &rows));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemorySink;

    #[test]
    fn test_parse_run_flags() {
        let args = Commands::parse_from(["chatdeck", "run", "--primary", "2", "--no-console"]);
        match args.command {
            Command::Run {
                primary, no_console, ..
            } => {
                assert_eq!(primary, Some(2));
                assert!(no_console);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_sessions_lists_roles() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("settings.json");
        let out = MemorySink::new();
        cmd_setup(&out, Some(&path), false).unwrap();
        cmd_sessions(&out, Some(&path)).unwrap();

        let text = out.text();
        assert!(text.contains("Wrote default settings"));
        assert!(text.contains("demo | primary | local"));
    }

    #[test]
    fn test_build_sessions_keeps_order() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.sessions.push(crate::config::SessionConfig {
            id: "second".to_string(),
            transport: Transport::Local {
                account: "b".to_string(),
                contacts: Vec::new(),
                rooms: Vec::new(),
            },
        });

        let sessions = build_sessions(&settings, temp_dir.path()).unwrap();
        let ids: Vec<&str> = sessions.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["demo", "second"]);
    }
}
