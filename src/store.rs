//! Remote list store seam and an in-process implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Songs,
    RedFlags,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::RedFlags => "red_flags",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Song {
        title: String,
        artist: String,
        genre: Option<String>,
        /// Who the request is for.
        dedication: Option<String>,
    },
    RedFlag {
        text: String,
    },
}

impl Entry {
    pub fn song(title: &str, artist: &str, genre: Option<&str>) -> Self {
        Entry::Song {
            title: title.to_string(),
            artist: artist.to_string(),
            genre: genre.map(str::to_string),
            dedication: None,
        }
    }

    /// Attaches a dedication to a song request. Red flags are unchanged.
    pub fn with_dedication(mut self, to: &str) -> Self {
        if let Entry::Song { dedication, .. } = &mut self {
            *dedication = Some(to.to_string());
        }
        self
    }

    pub fn red_flag(text: &str) -> Self {
        Entry::RedFlag {
            text: text.to_string(),
        }
    }

    pub fn table(&self) -> Table {
        match self {
            Entry::Song { .. } => Table::Songs,
            Entry::RedFlag { .. } => Table::RedFlags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
    pub created_at: DateTime<Utc>,
    pub entry: Entry,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("list store unreachable: {0}")]
    Offline(String),
    #[error("{entry} entries do not belong in {table}")]
    WrongTable {
        table: &'static str,
        entry: &'static str,
    },
}

pub trait ListStore: Send + Sync {
    /// Newest first, at most `limit` records.
    fn list(
        &self,
        table: Table,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    fn insert(
        &self,
        table: Table,
        entry: Entry,
    ) -> impl Future<Output = Result<Record, StoreError>> + Send;

    fn subscribe(
        &self,
        table: Table,
    ) -> impl Future<Output = Result<Subscription, StoreError>> + Send;
}

/// Stream of records inserted after it was opened.
#[derive(Debug)]
pub struct Subscription {
    table: Table,
    rx: broadcast::Receiver<Record>,
    cancel: CancellationToken,
}

impl Subscription {
    pub fn new(table: Table, rx: broadcast::Receiver<Record>) -> Self {
        Self {
            table,
            rx,
            cancel: CancellationToken::new(),
        }
    }

    pub fn table(&self) -> Table {
        self.table
    }

    /// Next insert, or `None` once unsubscribed or the store hangs up.
    pub async fn recv(&mut self) -> Option<Record> {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return None,
                received = self.rx.recv() => match received {
                    Ok(record) => return Some(record),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(table = self.table.name(), skipped, "realtime feed lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    }

    pub fn unsubscribe(&self) {
        self.cancel.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.cancel.is_cancelled()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// In-process store with broadcast fan-out per table.
#[derive(Debug)]
pub struct MemoryStore {
    rows: Mutex<HashMap<Table, Vec<Record>>>,
    songs_feed: broadcast::Sender<Record>,
    red_flags_feed: broadcast::Sender<Record>,
    next_id: AtomicU64,
    offline: Option<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    const FEED_CAPACITY: usize = 64;

    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            songs_feed: broadcast::channel(Self::FEED_CAPACITY).0,
            red_flags_feed: broadcast::channel(Self::FEED_CAPACITY).0,
            next_id: AtomicU64::new(1),
            offline: None,
        }
    }

    /// A store that fails every call.
    pub fn offline(reason: impl Into<String>) -> Self {
        Self {
            offline: Some(reason.into()),
            ..Self::new()
        }
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.offline {
            Some(reason) => Err(StoreError::Offline(reason.clone())),
            None => Ok(()),
        }
    }

    fn feed(&self, table: Table) -> &broadcast::Sender<Record> {
        match table {
            Table::Songs => &self.songs_feed,
            Table::RedFlags => &self.red_flags_feed,
        }
    }
}

impl ListStore for MemoryStore {
    async fn list(&self, table: Table, limit: usize) -> Result<Vec<Record>, StoreError> {
        self.check()?;
        let rows = self.rows.lock().unwrap_or_else(PoisonError::into_inner);
        let mut out: Vec<Record> = rows.get(&table).cloned().unwrap_or_default();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        out.truncate(limit);
        Ok(out)
    }

    async fn insert(&self, table: Table, entry: Entry) -> Result<Record, StoreError> {
        self.check()?;
        if entry.table() != table {
            return Err(StoreError::WrongTable {
                table: table.name(),
                entry: entry.table().name(),
            });
        }
        let record = Record {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            created_at: Utc::now(),
            entry,
        };
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(table)
            .or_default()
            .push(record.clone());
        // No subscribers is fine.
        let receivers = self.feed(table).send(record.clone()).unwrap_or(0);
        debug!(table = table.name(), id = record.id, receivers, "record inserted");
        Ok(record)
    }

    async fn subscribe(&self, table: Table) -> Result<Subscription, StoreError> {
        self.check()?;
        Ok(Subscription::new(table, self.feed(table).subscribe()))
    }
}
