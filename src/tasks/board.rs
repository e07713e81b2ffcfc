//! Crowd-sourced lists (songs, red flags) with optimistic submits and a
//! realtime feed. Falls back to sample entries when the store is offline.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::events::Notifier;
use crate::store::{Entry, ListStore, Record, Subscription, Table};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardMode {
    /// Not loaded yet.
    Idle,
    Synced,
    LocalOnly { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemId {
    Remote(u64),
    /// Seed or optimistic entry not (yet) stored remotely.
    Local(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub entry: Entry,
    /// Upvotes counted on this device; every entry starts with its own.
    pub votes: u32,
}

#[derive(Debug, Clone)]
pub struct BoardSetup {
    pub table: Table,
    pub limit: usize,
    pub max_chars: usize,
    pub seeds: Vec<Entry>,
}

impl BoardSetup {
    pub fn songs(limit: usize, max_chars: usize) -> Self {
        Self {
            table: Table::Songs,
            limit,
            max_chars,
            seeds: vec![
                Entry::song("Love Story", "Taylor Swift", Some("Pop")),
                Entry::song("Perfect", "Ed Sheeran", Some("Pop")),
                Entry::song("Thinking Out Loud", "Ed Sheeran", Some("Soul")),
                Entry::song("All of Me", "John Legend", Some("Soul")),
                Entry::song("Kiss Me", "Sixpence None the Richer", Some("Rock")),
            ],
        }
    }

    pub fn red_flags(limit: usize, max_chars: usize) -> Self {
        Self {
            table: Table::RedFlags,
            limit,
            max_chars,
            seeds: [
                "Bad communication",
                "Ghosting without explanation",
                "Still friends with ex",
                "Love bombing",
                "No ambition or goals",
                "Terrible music taste",
            ]
            .into_iter()
            .map(Entry::red_flag)
            .collect(),
        }
    }
}

pub struct Board<S> {
    store: Arc<S>,
    setup: BoardSetup,
    items: Vec<Item>,
    mode: BoardMode,
    subscription: Option<Subscription>,
    notifier: Notifier,
    next_local: u64,
}

impl<S: ListStore> Board<S> {
    pub fn new(store: Arc<S>, setup: BoardSetup, notifier: Notifier) -> Self {
        Self {
            store,
            setup,
            items: Vec::new(),
            mode: BoardMode::Idle,
            subscription: None,
            notifier,
            next_local: 0,
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn mode(&self) -> &BoardMode {
        &self.mode
    }

    pub fn table(&self) -> Table {
        self.setup.table
    }

    pub fn is_live(&self) -> bool {
        self.subscription.as_ref().is_some_and(Subscription::is_active)
    }

    /// Loads the newest entries and opens the realtime feed. An empty table
    /// shows the seeds; an unreachable store shows the seeds in local-only
    /// mode.
    pub async fn load(&mut self) -> &BoardMode {
        let table = self.setup.table;
        match self.store.list(table, self.setup.limit).await {
            Ok(records) if records.is_empty() => {
                debug!(table = table.name(), "table empty; showing seeds");
                self.show_seeds();
                self.mode = BoardMode::Synced;
            }
            Ok(records) => {
                info!(table = table.name(), count = records.len(), "board loaded");
                self.items = records.into_iter().map(Item::from).collect();
                self.mode = BoardMode::Synced;
            }
            Err(err) => {
                self.show_seeds();
                self.go_local(err.to_string());
                return &self.mode;
            }
        }

        match self.store.subscribe(table).await {
            Ok(subscription) => self.subscription = Some(subscription),
            Err(err) => self.go_local(err.to_string()),
        }
        &self.mode
    }

    fn show_seeds(&mut self) {
        let mut items = Vec::with_capacity(self.setup.seeds.len());
        for entry in self.setup.seeds.clone() {
            items.push(Item {
                id: self.local_id(),
                entry,
                votes: 1,
            });
        }
        items.truncate(self.setup.limit);
        self.items = items;
    }

    fn local_id(&mut self) -> ItemId {
        self.next_local += 1;
        ItemId::Local(self.next_local)
    }

    fn go_local(&mut self, reason: String) {
        warn!(table = self.setup.table.name(), %reason, "board is local-only");
        self.notifier
            .info("Live updates are unavailable; entries stay on this device.");
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.mode = BoardMode::LocalOnly { reason };
    }

    /// Trims and caps the entry. `None` when a required field is blank.
    fn normalize(&self, entry: Entry) -> Option<Entry> {
        let max = self.setup.max_chars;
        let cap = |s: &str| -> String { s.trim().chars().take(max).collect() };
        let optional = |s: Option<String>| s.map(|s| cap(&s)).filter(|s| !s.is_empty());
        match entry {
            Entry::Song {
                title,
                artist,
                genre,
                dedication,
            } => {
                let (title, artist) = (cap(&title), cap(&artist));
                if title.is_empty() || artist.is_empty() {
                    return None;
                }
                Some(Entry::Song {
                    title,
                    artist,
                    genre: optional(genre),
                    dedication: optional(dedication),
                })
            }
            Entry::RedFlag { text } => {
                let text = cap(&text);
                (!text.is_empty()).then_some(Entry::RedFlag { text })
            }
        }
    }

    /// Shows the entry immediately, then stores it. Returns `false` when
    /// the entry was rejected or the board has not been loaded yet.
    pub async fn submit(&mut self, entry: Entry) -> bool {
        let table = self.setup.table;
        if self.mode == BoardMode::Idle {
            warn!(table = table.name(), "submit before the board was loaded");
            self.notifier.error("The list is still loading, please try again in a moment");
            return false;
        }
        let Some(entry) = self.normalize(entry) else {
            self.notifier.error(match table {
                Table::Songs => "Please fill in song title and artist",
                Table::RedFlags => "Please share your red flag",
            });
            return false;
        };

        let local = self.local_id();
        self.items.insert(
            0,
            Item {
                id: local,
                entry: entry.clone(),
                votes: 1,
            },
        );
        self.items.truncate(self.setup.limit);

        if self.mode == BoardMode::Synced {
            match self.store.insert(table, entry).await {
                Ok(record) => self.confirm(local, record),
                Err(err) => self.go_local(err.to_string()),
            }
        }

        self.notifier.success(match table {
            Table::Songs => "Song request submitted successfully!",
            Table::RedFlags => "Red flag submitted!",
        });
        true
    }

    fn confirm(&mut self, local: ItemId, record: Record) {
        let remote = ItemId::Remote(record.id);
        if self.items.iter().any(|item| item.id == remote) {
            self.items.retain(|item| item.id != local);
        } else if let Some(item) = self.items.iter_mut().find(|item| item.id == local) {
            *item = Item {
                votes: item.votes,
                ..Item::from(record)
            };
        }
    }

    /// Adds one vote to a shown item and returns its new count.
    pub fn upvote(&mut self, id: ItemId) -> Option<u32> {
        let table = self.setup.table;
        let Some(item) = self.items.iter_mut().find(|item| item.id == id) else {
            debug!(table = table.name(), ?id, "vote for an item no longer shown");
            return None;
        };
        item.votes = item.votes.saturating_add(1);
        let votes = item.votes;
        self.notifier.success(match table {
            Table::Songs => "Vote recorded!",
            Table::RedFlags => "Red flag voted up!",
        });
        Some(votes)
    }

    /// Applies the next realtime insert. Returns `None` when the feed is
    /// closed, `Some(false)` for an echo of an entry already shown.
    pub async fn sync_next(&mut self) -> Option<bool> {
        let record = self.subscription.as_mut()?.recv().await?;
        if self.items.iter().any(|item| item.id == ItemId::Remote(record.id)) {
            let table = self.setup.table.name();
            debug!(table, id = record.id, "ignoring realtime echo");
            return Some(false);
        }
        self.items.insert(0, Item::from(record));
        self.items.truncate(self.setup.limit);
        Some(true)
    }

    /// Cancels the realtime feed.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            debug!(table = self.setup.table.name(), "board closed");
        }
    }
}

impl From<Record> for Item {
    fn from(record: Record) -> Self {
        Self {
            id: ItemId::Remote(record.id),
            entry: record.entry,
            votes: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::UnboundedReceiver;

    use crate::events::{drain, Notice, NoticeLevel};
    use crate::store::MemoryStore;

    fn red_flags(store: Arc<MemoryStore>) -> (Board<MemoryStore>, UnboundedReceiver<Notice>) {
        let (notifier, rx) = Notifier::channel();
        (Board::new(store, BoardSetup::red_flags(20, 150), notifier), rx)
    }

    #[tokio::test]
    async fn empty_table_shows_seeds_and_goes_live() {
        let (mut board, _rx) = red_flags(Arc::new(MemoryStore::new()));
        assert_eq!(board.load().await, &BoardMode::Synced);
        assert_eq!(board.items().len(), 6);
        assert!(board.is_live());
    }

    #[tokio::test]
    async fn offline_store_is_surfaced() {
        let (mut board, mut rx) = red_flags(Arc::new(MemoryStore::offline("down")));
        let mode = board.load().await.clone();
        assert!(matches!(mode, BoardMode::LocalOnly { .. }));
        assert_eq!(board.items().len(), 6);
        assert_eq!(drain(&mut rx)[0].level, NoticeLevel::Info);

        assert!(board.submit(Entry::red_flag("Never texts back")).await);
        assert_eq!(board.items()[0].entry, Entry::red_flag("Never texts back"));
        assert!(matches!(board.items()[0].id, ItemId::Local(_)));
    }

    #[tokio::test]
    async fn own_insert_is_not_duplicated_by_the_feed() {
        let store = Arc::new(MemoryStore::new());
        let (mut board, _rx) = red_flags(Arc::clone(&store));
        board.load().await;
        assert!(board.submit(Entry::red_flag("  Love bombing again  ")).await);
        assert_eq!(board.items()[0].entry, Entry::red_flag("Love bombing again"));
        assert!(matches!(board.items()[0].id, ItemId::Remote(_)));
        assert_eq!(board.sync_next().await, Some(false));
        assert_eq!(board.items().len(), 7);
    }

    #[tokio::test]
    async fn other_inserts_arrive_through_the_feed() {
        let store = Arc::new(MemoryStore::new());
        let (mut board, _rx) = red_flags(Arc::clone(&store));
        board.load().await;
        store
            .insert(Table::RedFlags, Entry::red_flag("Chews loudly"))
            .await
            .unwrap();
        assert_eq!(board.sync_next().await, Some(true));
        assert_eq!(board.items()[0].entry, Entry::red_flag("Chews loudly"));
        board.close();
        assert_eq!(board.sync_next().await, None);
    }

    #[tokio::test]
    async fn blank_and_long_entries() {
        let (mut board, mut rx) = red_flags(Arc::new(MemoryStore::new()));
        board.load().await;
        assert!(!board.submit(Entry::red_flag("   ")).await);
        assert_eq!(drain(&mut rx)[0].message, "Please share your red flag");

        board.submit(Entry::red_flag(&"x".repeat(400))).await;
        let Entry::RedFlag { text } = &board.items()[0].entry else {
            panic!("expected a red flag");
        };
        assert_eq!(text.chars().count(), 150);
    }

    #[tokio::test]
    async fn list_is_kept_to_its_limit() {
        let store = Arc::new(MemoryStore::new());
        let (notifier, _rx) = Notifier::channel();
        let mut board = Board::new(store, BoardSetup::songs(3, 150), notifier);
        board.load().await;
        assert_eq!(board.items().len(), 3);
        board.submit(Entry::song("Adorn", "Miguel", None)).await;
        assert_eq!(board.items().len(), 3);
        assert_eq!(board.items()[0].entry, Entry::song("Adorn", "Miguel", None));
    }

    #[tokio::test]
    async fn submit_before_load_is_refused() {
        let store = Arc::new(MemoryStore::new());
        let (mut board, mut rx) = red_flags(Arc::clone(&store));
        assert!(!board.submit(Entry::red_flag("Never calls back")).await);
        assert!(board.items().is_empty());
        let notices = drain(&mut rx);
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].level, NoticeLevel::Error);

        board.load().await;
        assert!(board.submit(Entry::red_flag("Never calls back")).await);
        assert_eq!(store.list(Table::RedFlags, 10).await.unwrap().len(), 1);
        assert_eq!(board.items()[0].entry, Entry::red_flag("Never calls back"));
    }

    #[tokio::test]
    async fn upvotes_count_per_item() {
        let (mut board, mut rx) = red_flags(Arc::new(MemoryStore::new()));
        board.load().await;
        board.submit(Entry::red_flag("Chews loudly")).await;
        drain(&mut rx);

        let id = board.items()[0].id;
        assert_eq!(board.items()[0].votes, 1);
        assert_eq!(board.upvote(id), Some(2));
        assert_eq!(board.upvote(id), Some(3));
        assert_eq!(board.items()[1].votes, 1);
        assert_eq!(drain(&mut rx)[0].message, "Red flag voted up!");
        assert_eq!(board.upvote(ItemId::Remote(999)), None);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn song_votes_and_dedications() {
        let store = Arc::new(MemoryStore::new());
        let (notifier, mut rx) = Notifier::channel();
        let mut board = Board::new(Arc::clone(&store), BoardSetup::songs(30, 10), notifier);
        board.load().await;
        let song =
            Entry::song("Adorn", "Miguel", None).with_dedication("  for my favourite person ");
        assert!(board.submit(song).await);
        assert_eq!(
            board.items()[0].entry,
            Entry::song("Adorn", "Miguel", None).with_dedication("for my fav")
        );
        drain(&mut rx);
        let id = board.items()[0].id;
        assert_eq!(board.upvote(id), Some(2));
        assert_eq!(drain(&mut rx)[0].message, "Vote recorded!");
    }
}
