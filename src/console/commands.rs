//! Console commands: `send`, `ls`, `search` and `help`.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;

use super::output::OutputSink;
use super::table;
use super::tokenizer::Token;
use crate::directory::{
    ContactQuery, Directory, Matcher, Recipient, RoomQuery, SearchEngine, SearchPattern, TargetKind,
};
use crate::error::{Error, Result};

/// What a command needs from the outside world.
#[derive(Clone)]
pub struct CommandContext {
    pub directory: Arc<dyn Directory>,
    pub out: Arc<dyn OutputSink>,
}

impl CommandContext {
    fn warn(&self, message: &str) {
        self.out.log(&format!("{} {}", "Warning:".yellow(), message));
    }
}

#[async_trait]
pub trait Command: Send + Sync {
    fn name(&self) -> &'static str;

    fn usage(&self) -> &'static str;

    /// Run with the tokens after the command name.
    async fn run(&self, ctx: &CommandContext, args: &[Token]) -> Result<()>;
}

/// Routes a tokenized line to the command named by its first token.
pub struct Dispatcher {
    ctx: CommandContext,
    commands: BTreeMap<&'static str, Box<dyn Command>>,
}

impl Dispatcher {
    pub fn new(directory: Arc<dyn Directory>, out: Arc<dyn OutputSink>) -> Self {
        let mut dispatcher = Self {
            ctx: CommandContext { directory, out },
            commands: BTreeMap::new(),
        };
        dispatcher.register(Box::new(SendCommand));
        dispatcher.register(Box::new(LsCommand));
        dispatcher.register(Box::new(SearchCommand));

        let mut usages: Vec<(&'static str, &'static str)> = dispatcher
            .commands
            .values()
            .map(|c| (c.name(), c.usage()))
            .collect();
        usages.push((HELP_NAME, HELP_USAGE));
        usages.sort();
        dispatcher.register(Box::new(HelpCommand { usages }));
        dispatcher
    }

    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.name(), command);
    }

    /// Run one tokenized line. Problems are reported through the output
    /// sink; nothing is returned.
    pub async fn execute(&self, tokens: &[Token]) {
        let Some((first, args)) = tokens.split_first() else {
            return;
        };

        let name = match (first.is_flag(), first.value()) {
            (false, Some(name)) => name,
            _ => {
                self.unknown(&first.display());
                return;
            }
        };

        let Some(command) = self.commands.get(name) else {
            self.unknown(name);
            return;
        };

        tracing::debug!("Dispatching {} with {} argument(s)", name, args.len());

        match command.run(&self.ctx, args).await {
            Ok(()) => {}
            Err(Error::Usage(message)) => {
                self.ctx.out.log(&format!("{} {}", "Error:".red(), message));
                self.ctx.out.log(&format!("Usage: {}", command.usage()));
            }
            Err(e) => {
                tracing::debug!("Command {} failed: {}", name, e);
                self.ctx.out.log(&format!("{} {}", "Error:".red(), e));
            }
        }
    }

    fn unknown(&self, name: &str) {
        self.ctx.out.log(&format!(
            "Unknown command \"{}\". Type help to list commands.",
            name
        ));
    }
}

fn lookup_error(e: Error) -> Error {
    match e {
        Error::Lookup(_) => e,
        other => Error::lookup(other.to_string()),
    }
}

/// Keep the first value for a slot; later ones are reported and ignored.
fn set_once<'a>(ctx: &CommandContext, slot: &mut Option<&'a str>, token: &'a Token, what: &str) {
    match token.value() {
        None => ctx.warn(&format!("{} expects a value, ignored {}", what, token.display())),
        Some(_) if slot.is_some() => {
            ctx.warn(&format!("Duplicate {}, ignored {}", what, token.display()))
        }
        Some(value) => *slot = Some(value),
    }
}

struct SendCommand;

#[async_trait]
impl Command for SendCommand {
    fn name(&self) -> &'static str {
        "send"
    }

    fn usage(&self) -> &'static str {
        "send <target> [-t|--targetType room|contact] -m|--message <text>"
    }

    async fn run(&self, ctx: &CommandContext, args: &[Token]) -> Result<()> {
        let mut target = None;
        let mut kind = None;
        let mut message = None;

        for token in args {
            match token.flag_name() {
                None => set_once(ctx, &mut target, token, "target"),
                Some("t" | "targetType") => set_once(ctx, &mut kind, token, "target type"),
                Some("m" | "message") => set_once(ctx, &mut message, token, "message"),
                Some(_) => ctx.warn(&format!("Unknown option {} ignored", token.display())),
            }
        }

        let kind = kind
            .map(|k| k.parse::<TargetKind>())
            .transpose()?
            .unwrap_or_default();
        let target = target.ok_or_else(|| Error::usage("Missing target"))?;
        let message = message.ok_or_else(|| Error::usage("Missing message"))?;

        let recipient = match kind {
            TargetKind::Contact => ctx
                .directory
                .find_contact(&ContactQuery::Name(Matcher::Exact(target.to_string())))
                .await
                .map_err(lookup_error)?
                .map(Recipient::Contact),
            TargetKind::Room => ctx
                .directory
                .find_room(&RoomQuery::Topic(Matcher::Exact(target.to_string())))
                .await
                .map_err(lookup_error)?
                .map(Recipient::Room),
        };

        let Some(recipient) = recipient else {
            ctx.out.log(&format!("{} \"{}\" not found", kind.title(), target));
            return Ok(());
        };

        ctx.directory
            .say(&recipient, message)
            .await
            .map_err(lookup_error)?;
        tracing::info!("Sent message to {} ({})", recipient, recipient.id());
        ctx.out.log(&format!("Message sent to {}", recipient));
        Ok(())
    }
}

struct LsCommand;

#[async_trait]
impl Command for LsCommand {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn usage(&self) -> &'static str {
        "ls [-c|--contact] [-r|--room]"
    }

    async fn run(&self, ctx: &CommandContext, args: &[Token]) -> Result<()> {
        let mut contacts = false;
        let mut rooms = false;

        for token in args {
            match token.flag_name() {
                None => {
                    return Err(Error::usage(format!(
                        "ls takes no argument, got {}",
                        token.display()
                    )))
                }
                Some(_) if token.value().is_some() => {
                    return Err(Error::usage(format!(
                        "ls options take no value, got {}",
                        token.display()
                    )))
                }
                Some("c" | "contact") => contacts = true,
                Some("r" | "room") => rooms = true,
                Some(_) => {
                    return Err(Error::usage(format!("Unknown option {}", token.display())))
                }
            }
        }

        if !contacts && !rooms {
            contacts = true;
            rooms = true;
        }

        let list_contacts = async {
            if !contacts {
                return None;
            }
            Some(match ctx.directory.find_contacts(None).await {
                Ok(found) if found.is_empty() => "No contacts found".to_string(),
                Ok(found) => format!("Contacts ({}):\n{}", found.len(), table::contacts(&found)),
                Err(e) => format!("{} listing contacts: {}", "Error:".red(), e),
            })
        };
        let list_rooms = async {
            if !rooms {
                return None;
            }
            Some(match ctx.directory.find_rooms(None).await {
                Ok(found) if found.is_empty() => "No rooms found".to_string(),
                Ok(found) => format!("Rooms ({}):\n{}", found.len(), table::rooms(&found)),
                Err(e) => format!("{} listing rooms: {}", "Error:".red(), e),
            })
        };

        let (contacts, rooms) = tokio::join!(list_contacts, list_rooms);
        for block in [contacts, rooms].into_iter().flatten() {
            ctx.out.log(&block);
        }
        Ok(())
    }
}

struct SearchCommand;

#[async_trait]
impl Command for SearchCommand {
    fn name(&self) -> &'static str {
        "search"
    }

    fn usage(&self) -> &'static str {
        "search <text|/regex/> [-t|--targetType room|contact]"
    }

    async fn run(&self, ctx: &CommandContext, args: &[Token]) -> Result<()> {
        let mut pattern = None;
        let mut kind = None;

        for token in args {
            match (token.flag_name(), token.value()) {
                (None, Some(value)) if pattern.is_none() => pattern = Some(value),
                (None, _) => {
                    return Err(Error::usage(format!(
                        "search takes a single pattern, got {} as well",
                        token.display()
                    )))
                }
                (Some("t" | "targetType"), Some(value)) if kind.is_none() => {
                    kind = Some(value.parse::<TargetKind>()?)
                }
                (Some("t" | "targetType"), Some(_)) => {
                    return Err(Error::usage("Target type given more than once"))
                }
                (Some("t" | "targetType"), None) => {
                    return Err(Error::usage(format!("{} expects a value", token.display())))
                }
                (Some(_), _) => {
                    return Err(Error::usage(format!("Unknown option {}", token.display())))
                }
            }
        }

        let pattern = SearchPattern::parse(pattern.ok_or_else(|| Error::usage("Missing pattern"))?);
        let report = SearchEngine::new(ctx.directory.clone())
            .search(&pattern, kind)
            .await?;

        for block in report.render() {
            ctx.out.log(&block);
        }
        Ok(())
    }
}

const HELP_NAME: &str = "help";
const HELP_USAGE: &str = "help [<command>]";

struct HelpCommand {
    usages: Vec<(&'static str, &'static str)>,
}

impl HelpCommand {
    fn general(&self) -> String {
        let mut text = String::from("Available commands:");
        for (_, usage) in &self.usages {
            text.push_str("\n  ");
            text.push_str(usage);
        }
        text
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn name(&self) -> &'static str {
        HELP_NAME
    }

    fn usage(&self) -> &'static str {
        HELP_USAGE
    }

    async fn run(&self, ctx: &CommandContext, args: &[Token]) -> Result<()> {
        match args {
            [] => {
                let names: Vec<&str> = self.usages.iter().map(|(name, _)| *name).collect();
                ctx.out.log(&format!("Available commands: {}", names.join(", ")));
            }
            [token] if !token.is_flag() => {
                let name = token.value().unwrap_or_default();
                match self.usages.iter().find(|(n, _)| *n == name) {
                    Some((_, usage)) => ctx.out.log(&format!("Usage: {}", usage)),
                    None => {
                        ctx.out.log(&format!("{} Unknown command \"{}\"", "Error:".red(), name));
                        ctx.out.log(&self.general());
                    }
                }
            }
            _ => {
                ctx.out.log(&format!(
                    "{} help takes at most one command name",
                    "Error:".red()
                ));
                ctx.out.log(&self.general());
            }
        }
        Ok(())
    }
}
