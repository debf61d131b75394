//! Pattern search over contacts and rooms.
//!
//! A pattern wrapped in slashes (`/ad.*m/`) is a regular expression; anything
//! else is a literal substring. Both are case-insensitive.

use std::collections::HashSet;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};

use super::{Contact, ContactQuery, Directory, Matcher, Room, RoomQuery, TargetKind};
use crate::console::table;
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternMode {
    Literal,
    Regex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPattern {
    raw: String,
    mode: PatternMode,
}

impl SearchPattern {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let mode = if raw.len() >= 2 && raw.starts_with('/') && raw.ends_with('/') {
            PatternMode::Regex
        } else {
            PatternMode::Literal
        };
        Self { raw, mode }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn mode(&self) -> PatternMode {
        self.mode
    }

    pub fn compile(&self) -> Result<Regex> {
        let source = match self.mode {
            PatternMode::Regex => self.raw[1..self.raw.len() - 1].to_string(),
            PatternMode::Literal => regex::escape(&self.raw),
        };
        RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::Pattern(e.to_string()))
    }
}

/// Results per category. `None` means the category was not searched.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub contacts: Option<Result<Vec<Contact>>>,
    pub rooms: Option<Result<Vec<Room>>>,
}

impl SearchReport {
    /// Render each searched category as a block of text.
    pub fn render(&self) -> Vec<String> {
        let mut blocks = Vec::new();
        if let Some(result) = &self.contacts {
            blocks.push(render_category(result, "contacts", table::contacts));
        }
        if let Some(result) = &self.rooms {
            blocks.push(render_category(result, "rooms", table::rooms));
        }
        blocks
    }
}

fn render_category<T>(
    result: &Result<Vec<T>>,
    category: &str,
    render: fn(&[T]) -> String,
) -> String {
    match result {
        Ok(items) if items.is_empty() => format!("No matching {} found", category),
        Ok(items) => format!("Matching {} ({}):\n{}", category, items.len(), render(items)),
        Err(e) => format!("Searching {} failed: {}", category, e),
    }
}

pub struct SearchEngine {
    directory: Arc<dyn Directory>,
}

impl SearchEngine {
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self { directory }
    }

    /// Search contacts, rooms, or both. An invalid pattern aborts the whole
    /// search before any lookup happens.
    pub async fn search(
        &self,
        pattern: &SearchPattern,
        kind: Option<TargetKind>,
    ) -> Result<SearchReport> {
        let re = pattern.compile()?;
        tracing::debug!("Searching {:?} for {:?} ({:?})", kind, pattern.raw(), pattern.mode());

        let report = match kind {
            Some(TargetKind::Contact) => SearchReport {
                contacts: Some(self.search_contacts(&re).await),
                rooms: None,
            },
            Some(TargetKind::Room) => SearchReport {
                contacts: None,
                rooms: Some(self.search_rooms(&re).await),
            },
            None => {
                let (contacts, rooms) = tokio::join!(self.search_contacts(&re), self.search_rooms(&re));
                SearchReport {
                    contacts: Some(contacts),
                    rooms: Some(rooms),
                }
            }
        };
        Ok(report)
    }

    async fn search_contacts(&self, re: &Regex) -> Result<Vec<Contact>> {
        let by_name = ContactQuery::Name(Matcher::Pattern(re.clone()));
        let by_alias = ContactQuery::Alias(Matcher::Pattern(re.clone()));
        let (names, aliases) = tokio::join!(
            self.directory.find_contacts(Some(&by_name)),
            self.directory.find_contacts(Some(&by_alias))
        );

        let mut seen = HashSet::new();
        Ok(names?
            .into_iter()
            .chain(aliases?)
            .filter(|c| seen.insert(c.id.clone()))
            .collect())
    }

    async fn search_rooms(&self, re: &Regex) -> Result<Vec<Room>> {
        let by_topic = RoomQuery::Topic(Matcher::Pattern(re.clone()));
        self.directory.find_rooms(Some(&by_topic)).await
    }
}
