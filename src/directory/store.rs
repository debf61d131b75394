//! In-memory contact/room store with an optional JSON snapshot on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use super::{Contact, ContactQuery, Room, RoomQuery};
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    contacts: Vec<Contact>,
    #[serde(default)]
    rooms: Vec<Room>,
}

/// Insertion-ordered, id-keyed store of contacts and rooms.
#[derive(Debug, Default)]
pub struct DirectoryStore {
    path: Option<PathBuf>,
    inner: Mutex<Snapshot>,
}

impl DirectoryStore {
    pub fn new(contacts: Vec<Contact>, rooms: Vec<Room>) -> Self {
        let store = Self::default();
        for contact in contacts {
            store.upsert_contact(contact);
        }
        for room in rooms {
            store.upsert_room(room);
        }
        store
    }

    /// Open a store backed by `path`, loading the snapshot if it exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let snapshot = if path.exists() {
            let content = fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Snapshot::default()
        };

        tracing::debug!(
            "Loaded directory snapshot {} ({} contacts, {} rooms)",
            path.display(),
            snapshot.contacts.len(),
            snapshot.rooms.len()
        );

        Ok(Self {
            path: Some(path),
            inner: Mutex::new(snapshot),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Snapshot> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert or replace a contact. Returns true when anything changed.
    pub fn upsert_contact(&self, contact: Contact) -> bool {
        let mut inner = self.lock();
        match inner.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(existing) if *existing == contact => false,
            Some(existing) => {
                *existing = contact;
                true
            }
            None => {
                inner.contacts.push(contact);
                true
            }
        }
    }

    /// Insert or replace a room. Returns true when anything changed.
    pub fn upsert_room(&self, room: Room) -> bool {
        let mut inner = self.lock();
        match inner.rooms.iter_mut().find(|r| r.id == room.id) {
            Some(existing) if *existing == room => false,
            Some(existing) => {
                *existing = room;
                true
            }
            None => {
                inner.rooms.push(room);
                true
            }
        }
    }

    pub fn contacts(&self, query: Option<&ContactQuery>) -> Vec<Contact> {
        self.lock()
            .contacts
            .iter()
            .filter(|c| query.map_or(true, |q| q.matches(c)))
            .cloned()
            .collect()
    }

    pub fn rooms(&self, query: Option<&RoomQuery>) -> Vec<Room> {
        self.lock()
            .rooms
            .iter()
            .filter(|r| query.map_or(true, |q| q.matches(r)))
            .cloned()
            .collect()
    }

    pub fn contact(&self, query: &ContactQuery) -> Option<Contact> {
        self.lock().contacts.iter().find(|c| query.matches(c)).cloned()
    }

    pub fn room(&self, query: &RoomQuery) -> Option<Room> {
        self.lock().rooms.iter().find(|r| query.matches(r)).cloned()
    }

    /// Write the snapshot file, if this store has one.
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&*self.lock())?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }
}
