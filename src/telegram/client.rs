//! Telegram bot session - simple long-polling version.

use std::path::Path;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{Chat, UpdateKind, User};

use crate::directory::{Contact, ContactQuery, Directory, DirectoryStore, Recipient, Room, RoomQuery};
use crate::error::{Error, Result};
use crate::session::{EventSender, InboundMessage, MessageContext, Session, SessionEvent};

/// Seconds a `getUpdates` call may wait for new updates.
const POLL_TIMEOUT_SECS: u32 = 30;

/// Pause after a failed poll before trying again.
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Where a message was posted.
#[derive(Debug, Clone)]
enum Place {
    Direct(Contact),
    Group(Room),
}

pub struct TelegramSession {
    id: String,
    bot: Bot,
    store: DirectoryStore,
    me: OnceLock<String>,
}

impl TelegramSession {
    /// The directory snapshot lives in `cache_dir/<id>.json`.
    pub fn new(id: impl Into<String>, token: impl Into<String>, cache_dir: &Path) -> Result<Self> {
        let id = id.into();
        let store = DirectoryStore::open(cache_dir.join(format!("{}.json", id)))?;
        Ok(Self {
            bot: Bot::new(token),
            id,
            store,
            me: OnceLock::new(),
        })
    }

    async fn poll(self: Arc<Self>, events: EventSender) {
        let mut offset = 0;

        while !events.is_closed() {
            let updates = match self
                .bot
                .get_updates()
                .offset(offset)
                .timeout(POLL_TIMEOUT_SECS)
                .await
            {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("[{}] getUpdates failed: {}", self.id, e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = update.id.as_offset();
                let UpdateKind::Message(msg) = update.kind else {
                    continue;
                };
                let Some(text) = msg.text() else {
                    continue;
                };
                let Some(from) = msg.from.as_ref() else {
                    continue;
                };

                let place = place_of(&msg.chat);
                let sender = contact_from_user(from);
                self.remember(&place, &sender);

                let me = self.me.get().map(String::as_str).unwrap_or_default();
                let context = build_context(place, sender, me);
                let inbound = InboundMessage {
                    text: text.to_string(),
                    context,
                };
                if events.send(SessionEvent::MessageReceived(inbound)).is_err() {
                    return;
                }
            }
        }
    }

    fn remember(&self, place: &Place, sender: &Contact) {
        let mut changed = self.store.upsert_contact(sender.clone());
        changed |= match place {
            Place::Direct(contact) => self.store.upsert_contact(contact.clone()),
            Place::Group(room) => self.store.upsert_room(room.clone()),
        };
        if changed {
            if let Err(e) = self.store.save() {
                tracing::warn!("[{}] Failed to save directory snapshot: {}", self.id, e);
            }
        }
    }
}

fn contact_from_user(user: &User) -> Contact {
    Contact {
        id: user.id.0.to_string(),
        name: user.full_name(),
        alias: user.username.clone(),
    }
}

fn place_of(chat: &Chat) -> Place {
    if chat.is_private() {
        let name = [chat.first_name(), chat.last_name()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        Place::Direct(Contact {
            id: chat.id.0.to_string(),
            name,
            alias: chat.username().map(str::to_string),
        })
    } else {
        Place::Group(Room {
            id: chat.id.0.to_string(),
            topic: chat.title().unwrap_or_default().to_string(),
        })
    }
}

/// `me` is the bot's own user id.
fn build_context(place: Place, sender: Contact, me: &str) -> MessageContext {
    let is_from_self = !me.is_empty() && sender.id == me;
    match place {
        Place::Group(room) => MessageContext {
            is_from_self,
            room: Some(room),
            listener: None,
            sender,
        },
        Place::Direct(partner) => MessageContext {
            is_from_self,
            room: None,
            listener: Some(partner),
            sender,
        },
    }
}

fn chat_id(to: &Recipient) -> Result<ChatId> {
    to.id()
        .parse::<i64>()
        .map(ChatId)
        .map_err(|_| Error::Telegram(format!("{} has no numeric chat id", to)))
}

#[async_trait]
impl Directory for TelegramSession {
    async fn find_contact(&self, query: &ContactQuery) -> Result<Option<Contact>> {
        Ok(self.store.contact(query))
    }

    async fn find_contacts(&self, query: Option<&ContactQuery>) -> Result<Vec<Contact>> {
        Ok(self.store.contacts(query))
    }

    async fn find_room(&self, query: &RoomQuery) -> Result<Option<Room>> {
        Ok(self.store.room(query))
    }

    async fn find_rooms(&self, query: Option<&RoomQuery>) -> Result<Vec<Room>> {
        Ok(self.store.rooms(query))
    }

    async fn say(&self, to: &Recipient, content: &str) -> Result<()> {
        self.bot
            .send_message(chat_id(to)?, content)
            .await
            .map_err(|e| Error::Telegram(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl Session for TelegramSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn directory(self: Arc<Self>) -> Arc<dyn Directory> {
        self
    }

    async fn start(self: Arc<Self>, events: EventSender) -> Result<()> {
        let _ = events.send(SessionEvent::Started);

        let me = self
            .bot
            .get_me()
            .await
            .map_err(|e| Error::Telegram(e.to_string()))?;
        let _ = self.me.set(me.user.id.0.to_string());

        let _ = events.send(SessionEvent::LoggedIn {
            account: format!("@{}", me.username()),
        });

        tokio::spawn(self.clone().poll(events));
        Ok(())
    }
}
