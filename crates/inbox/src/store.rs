//! In-memory message state, keyed by platform-qualified id.
//!
//! Messages are only ever inserted or refreshed, never removed. Unread
//! counts are derived from the stored flags on every query.

use std::{
    collections::{BTreeMap, HashMap, hash_map::Entry},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use chatnest_common::{Message, MessageScope, Platform};

/// Outcome of [`MessageStore::mark_read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkOutcome {
    /// The message was unread and is now read.
    Marked,
    AlreadyRead,
    Unknown,
}

#[derive(Default)]
pub struct MessageStore {
    messages: RwLock<HashMap<String, Message>>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Message>> {
        self.messages.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Message>> {
        self.messages.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert new messages and refresh known ones, returning the stored
    /// copies in input order. A message read locally stays read even if the
    /// provider still reports it unread.
    pub fn upsert(&self, fresh: Vec<Message>) -> Vec<Message> {
        let mut messages = self.write();
        fresh
            .into_iter()
            .map(|msg| {
                let stored = match messages.entry(msg.id.clone()) {
                    Entry::Occupied(slot) => {
                        let existing = slot.into_mut();
                        existing.refresh_from(msg);
                        existing
                    },
                    Entry::Vacant(slot) => slot.insert(msg),
                };
                stored.clone()
            })
            .collect()
    }

    pub fn get(&self, id: &str) -> Option<Message> {
        self.read().get(id).cloned()
    }

    /// Stored messages in scope, newest first, at most `limit`.
    pub fn list(&self, scope: MessageScope, limit: usize) -> Vec<Message> {
        let mut out: Vec<Message> = self
            .read()
            .values()
            .filter(|m| scope.includes(m.platform))
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        out.truncate(limit);
        out
    }

    /// The latest `limit` stored messages of one thread, oldest first.
    pub fn thread(&self, thread_id: &str, limit: usize) -> Vec<Message> {
        let mut out: Vec<Message> = self
            .read()
            .values()
            .filter(|m| m.thread_id == thread_id)
            .cloned()
            .collect();
        sort_newest_first(&mut out);
        out.truncate(limit);
        out.reverse();
        out
    }

    pub fn mark_read(&self, id: &str) -> MarkOutcome {
        match self.write().get_mut(id) {
            Some(msg) => {
                if msg.mark_read() {
                    MarkOutcome::Marked
                } else {
                    MarkOutcome::AlreadyRead
                }
            },
            None => MarkOutcome::Unknown,
        }
    }

    /// Unread count for every platform, zero for platforms never fetched.
    pub fn unread_counts(&self) -> BTreeMap<Platform, usize> {
        let mut counts: BTreeMap<Platform, usize> =
            Platform::ALL.into_iter().map(|p| (p, 0)).collect();
        for msg in self.read().values().filter(|m| m.is_unread) {
            *counts.entry(msg.platform).or_default() += 1;
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Timestamp descending; ties broken by id so the order is stable.
pub fn sort_newest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
}
