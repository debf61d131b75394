//! Contacts and rooms as seen by a messaging session.
//!
//! The [`Directory`] trait is the lookup/send surface a session backend
//! exposes to the console and the orchestrator.

pub mod search;
pub mod store;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub use search::{SearchEngine, SearchPattern, SearchReport};
pub use store::DirectoryStore;

/// A one-to-one correspondent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

impl Contact {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

/// A group conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    pub topic: String,
}

impl Room {
    pub fn new(id: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
        }
    }
}

/// Where an outbound message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    Contact(Contact),
    Room(Room),
}

impl Recipient {
    pub fn id(&self) -> &str {
        match self {
            Recipient::Contact(contact) => &contact.id,
            Recipient::Room(room) => &room.id,
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Recipient::Contact(contact) => write!(f, "contact \"{}\"", contact.name),
            Recipient::Room(room) => write!(f, "room \"{}\"", room.topic),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetKind {
    Room,
    #[default]
    Contact,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Room => "room",
            TargetKind::Contact => "contact",
        }
    }

    /// Capitalized form for the start of a message.
    pub fn title(&self) -> &'static str {
        match self {
            TargetKind::Room => "Room",
            TargetKind::Contact => "Contact",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "room" => Ok(TargetKind::Room),
            "contact" => Ok(TargetKind::Contact),
            other => Err(Error::usage(format!(
                "Invalid target type \"{}\", expected room or contact",
                other
            ))),
        }
    }
}

/// How a single field is compared.
#[derive(Debug, Clone)]
pub enum Matcher {
    Exact(String),
    Pattern(Regex),
}

impl Matcher {
    pub fn is_match(&self, field: &str) -> bool {
        match self {
            Matcher::Exact(expected) => field == expected,
            Matcher::Pattern(re) => re.is_match(field),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ContactQuery {
    Name(Matcher),
    Alias(Matcher),
}

impl ContactQuery {
    pub fn matches(&self, contact: &Contact) -> bool {
        match self {
            ContactQuery::Name(m) => m.is_match(&contact.name),
            ContactQuery::Alias(m) => contact.alias.as_deref().is_some_and(|a| m.is_match(a)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RoomQuery {
    Topic(Matcher),
}

impl RoomQuery {
    pub fn matches(&self, room: &Room) -> bool {
        match self {
            RoomQuery::Topic(m) => m.is_match(&room.topic),
        }
    }
}

/// Directory lookups and the `say` primitive of one session.
#[async_trait]
pub trait Directory: Send + Sync {
    /// First contact matching the query.
    async fn find_contact(&self, query: &ContactQuery) -> Result<Option<Contact>>;

    /// All contacts, or those matching the query.
    async fn find_contacts(&self, query: Option<&ContactQuery>) -> Result<Vec<Contact>>;

    /// First room matching the query.
    async fn find_room(&self, query: &RoomQuery) -> Result<Option<Room>>;

    /// All rooms, or those matching the query.
    async fn find_rooms(&self, query: Option<&RoomQuery>) -> Result<Vec<Room>>;

    async fn say(&self, to: &Recipient, content: &str) -> Result<()>;
}
