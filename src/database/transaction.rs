use serde_json::Value;

use super::{decode, encode, Collection, Database};
use crate::models::{Club, Event, User};
use crate::utils::error::AppResult;

/// All three collections, loaded together under their locks.
#[derive(Debug, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub clubs: Vec<Club>,
    pub events: Vec<Event>,
}

impl Snapshot {
    pub fn user_mut(&mut self, username: &str) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.username == username)
    }

    pub fn club_mut(&mut self, id: &str) -> Option<&mut Club> {
        self.clubs.iter_mut().find(|c| c.id == id)
    }

    pub fn event_mut(&mut self, id: &str) -> Option<&mut Event> {
        self.events.iter_mut().find(|e| e.id == id)
    }
}

impl Database {
    /// Read-modify-write across users, clubs and events as one logical operation.
    ///
    /// Locks are taken users → clubs → events. Only collections whose content
    /// changed are written, in the same order. If a write fails, collections
    /// already written in this cycle are restored to their prior content
    /// before the error is returned.
    pub async fn transact_all<R, F>(&self, f: F) -> AppResult<R>
    where
        F: FnOnce(&mut Snapshot) -> AppResult<R>,
    {
        let _users = self.locks.users.lock().await;
        let _clubs = self.locks.clubs.lock().await;
        let _events = self.locks.events.lock().await;

        let users_before = self.store.load(Collection::Users).await?;
        let clubs_before = self.store.load(Collection::Clubs).await?;
        let events_before = self.store.load(Collection::Events).await?;

        let mut snapshot = Snapshot {
            users: decode(Collection::Users, users_before.clone())?,
            clubs: decode(Collection::Clubs, clubs_before.clone())?,
            events: decode(Collection::Events, events_before.clone())?,
        };

        let out = f(&mut snapshot)?;

        let pending = [
            (Collection::Users, encode(&snapshot.users)?, users_before),
            (Collection::Clubs, encode(&snapshot.clubs)?, clubs_before),
            (Collection::Events, encode(&snapshot.events)?, events_before),
        ];

        let mut written: Vec<(Collection, Vec<Value>)> = Vec::new();
        for (collection, next, before) in pending {
            if next == before {
                continue;
            }
            if let Err(e) = self.store.save(collection, &next).await {
                log::warn!(
                    "⚠️  Saving {} failed, rolling back {} collection(s)",
                    collection.as_str(),
                    written.len()
                );
                self.compensate(&written).await;
                return Err(e);
            }
            written.push((collection, before));
        }

        Ok(out)
    }

    async fn compensate(&self, written: &[(Collection, Vec<Value>)]) {
        for (collection, before) in written.iter().rev() {
            match self.store.save(*collection, before).await {
                Ok(()) => log::info!("↩️  Restored {}", collection.as_str()),
                Err(e) => log::error!(
                    "❌ Could not restore {} after partial write: {}",
                    collection.as_str(),
                    e
                ),
            }
        }
    }
}
