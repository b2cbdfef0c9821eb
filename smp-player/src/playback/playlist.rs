//! Playlist Manager
//!
//! Ordered media items plus a cursor. Previous/next are derived from the
//! cursor on every read and never stored, so they cannot drift from it.
//!
//! Mutations append the events they cause to an outbox; the engine
//! publishes the outbox once its mutation lock is released.

use crate::error::{Error, Result};
use smp_common::events::PlayerEvent;
use smp_common::MediaItem;
use uuid::Uuid;

/// Where `insert` places a new item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    First,
    Last,
    /// Before the cursor; behaves as `Last` when the cursor is unset
    BeforeCurrent,
    /// After the cursor; behaves as `Last` when the cursor is unset
    AfterCurrent,
    /// Index in [0, len]
    AtIndex(usize),
}

/// Identifies an item to remove
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemRef {
    Id(Uuid),
    Index(usize),
}

/// Result of moving the cursor one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMove {
    /// Cursor moved to an adjacent item (or to the first/last item when unset)
    Moved,
    /// Cursor wrapped around the end of the playlist
    Wrapped,
    /// Cursor ran off the playlist and is now unset
    Ended,
    /// Playlist is empty, nothing happened
    Empty,
}

/// Result of removing an item
#[derive(Debug, Clone)]
pub struct Removal {
    pub item: MediaItem,
    pub was_current: bool,
}

/// Current/previous/next identities, for change detection
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cursor {
    current: Option<MediaItem>,
    previous: Option<MediaItem>,
    next: Option<MediaItem>,
}

fn same_item(a: &Option<MediaItem>, b: &Option<MediaItem>) -> bool {
    a.as_ref().map(MediaItem::id) == b.as_ref().map(MediaItem::id)
}

/// Ordered playlist with a cursor
#[derive(Debug, Clone)]
pub struct PlaylistManager {
    name: String,
    items: Vec<MediaItem>,
    current: Option<usize>,
    wrap: bool,
}

impl PlaylistManager {
    /// Create an empty playlist
    pub fn new(name: impl Into<String>, wrap: bool) -> Self {
        Self {
            name: name.into(),
            items: Vec::new(),
            current: None,
            wrap,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_item(&self) -> Option<&MediaItem> {
        self.current.and_then(|i| self.items.get(i))
    }

    pub fn previous_item(&self) -> Option<&MediaItem> {
        self.previous_index().and_then(|i| self.items.get(i))
    }

    pub fn next_item(&self) -> Option<&MediaItem> {
        self.next_index().and_then(|i| self.items.get(i))
    }

    pub fn position_of(&self, id: Uuid) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    fn previous_index(&self) -> Option<usize> {
        let current = self.current?;
        if current > 0 {
            Some(current - 1)
        } else if self.wrap {
            Some(self.items.len() - 1)
        } else {
            None
        }
    }

    fn next_index(&self) -> Option<usize> {
        let current = self.current?;
        if current + 1 < self.items.len() {
            Some(current + 1)
        } else if self.wrap {
            Some(0)
        } else {
            None
        }
    }

    fn cursor(&self) -> Cursor {
        Cursor {
            current: self.current_item().cloned(),
            previous: self.previous_item().cloned(),
            next: self.next_item().cloned(),
        }
    }

    /// Emit current/previous/next change events relative to `before`
    fn emit_cursor_changes(&self, before: Cursor, events: &mut Vec<PlayerEvent>) {
        let after = self.cursor();
        if !same_item(&before.current, &after.current) {
            events.push(PlayerEvent::CurrentMediaItemChanged {
                old: before.current,
                new: after.current,
            });
        }
        if !same_item(&before.previous, &after.previous) {
            events.push(PlayerEvent::PreviousMediaItemChanged {
                old: before.previous,
                new: after.previous,
            });
        }
        if !same_item(&before.next, &after.next) {
            events.push(PlayerEvent::NextMediaItemChanged {
                old: before.next,
                new: after.next,
            });
        }
    }

    fn playlist_start(&self) -> PlayerEvent {
        PlayerEvent::PlaylistStart {
            playlist: self.name.clone(),
        }
    }

    fn playlist_end(&self) -> PlayerEvent {
        PlayerEvent::PlaylistEnd {
            playlist: self.name.clone(),
        }
    }

    /// Remove all items and unset the cursor. Raises no events.
    pub fn clear(&mut self) {
        self.items.clear();
        self.current = None;
    }

    /// Change the wrap policy; derived neighbours may change
    pub fn set_wrap(&mut self, wrap: bool, events: &mut Vec<PlayerEvent>) {
        let before = self.cursor();
        self.wrap = wrap;
        self.emit_cursor_changes(before, events);
    }

    /// Insert an item, returning the index it landed at
    ///
    /// Inserting into an empty playlist points the cursor at the new item
    /// and raises `PlaylistStart` followed by `CurrentMediaItemChanged`.
    pub fn insert(
        &mut self,
        position: InsertPosition,
        item: MediaItem,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<usize> {
        let len = self.items.len();
        let index = match position {
            InsertPosition::First => 0,
            InsertPosition::Last => len,
            InsertPosition::BeforeCurrent => self.current.unwrap_or(len),
            InsertPosition::AfterCurrent => self.current.map(|c| c + 1).unwrap_or(len),
            InsertPosition::AtIndex(n) if n <= len => n,
            InsertPosition::AtIndex(n) => return Err(Error::InvalidIndex { index: n, len }),
        };

        let before = self.cursor();
        let was_empty = self.items.is_empty();
        self.items.insert(index, item);

        if was_empty {
            self.current = Some(0);
            events.push(self.playlist_start());
        } else if let Some(current) = self.current {
            if index <= current {
                self.current = Some(current + 1);
            }
        }

        self.emit_cursor_changes(before, events);
        Ok(index)
    }

    /// Remove an item by identity or index
    ///
    /// When the current item is removed the cursor moves to the item that
    /// followed it, else the one before it, else becomes unset and
    /// `PlaylistEnd` is raised.
    pub fn remove(&mut self, target: ItemRef, events: &mut Vec<PlayerEvent>) -> Result<Removal> {
        let index = match target {
            ItemRef::Id(id) => self.position_of(id).ok_or(Error::ItemNotFound(id))?,
            ItemRef::Index(n) if n < self.items.len() => n,
            ItemRef::Index(n) => {
                return Err(Error::InvalidIndex {
                    index: n,
                    len: self.items.len(),
                })
            }
        };

        let before = self.cursor();
        let item = self.items.remove(index);
        let remaining = self.items.len();

        let was_current = self.current == Some(index);
        self.current = match self.current {
            Some(c) if c == index => {
                if index < remaining {
                    Some(index)
                } else if index > 0 {
                    Some(index - 1)
                } else {
                    None
                }
            }
            Some(c) if index < c => Some(c - 1),
            other => other,
        };

        self.emit_cursor_changes(before, events);
        if was_current && self.current.is_none() {
            events.push(self.playlist_end());
        }

        Ok(Removal { item, was_current })
    }

    /// Point the cursor at index `n`
    pub fn change_current_index(&mut self, n: usize, events: &mut Vec<PlayerEvent>) -> Result<()> {
        if n >= self.items.len() {
            return Err(Error::InvalidIndex {
                index: n,
                len: self.items.len(),
            });
        }
        let before = self.cursor();
        self.current = Some(n);
        self.emit_cursor_changes(before, events);
        Ok(())
    }

    /// Point an unset cursor at the first item; returns the current item
    pub fn ensure_cursor(&mut self, events: &mut Vec<PlayerEvent>) -> Option<MediaItem> {
        if self.current.is_none() && !self.items.is_empty() {
            let before = self.cursor();
            self.current = Some(0);
            self.emit_cursor_changes(before, events);
        }
        self.current_item().cloned()
    }

    /// Move the cursor forward one slot
    pub fn next(&mut self, events: &mut Vec<PlayerEvent>) -> CursorMove {
        if self.items.is_empty() {
            return CursorMove::Empty;
        }
        let before = self.cursor();
        let last = self.items.len() - 1;
        let outcome = match self.current {
            None => {
                self.current = Some(0);
                CursorMove::Moved
            }
            Some(c) if c < last => {
                self.current = Some(c + 1);
                CursorMove::Moved
            }
            Some(_) if self.wrap => {
                self.current = Some(0);
                CursorMove::Wrapped
            }
            Some(_) => {
                self.current = None;
                CursorMove::Ended
            }
        };
        self.emit_cursor_changes(before, events);
        if outcome == CursorMove::Ended {
            events.push(self.playlist_end());
        }
        outcome
    }

    /// Move the cursor back one slot
    pub fn previous(&mut self, events: &mut Vec<PlayerEvent>) -> CursorMove {
        if self.items.is_empty() {
            return CursorMove::Empty;
        }
        let before = self.cursor();
        let last = self.items.len() - 1;
        let outcome = match self.current {
            None => {
                self.current = Some(last);
                CursorMove::Moved
            }
            Some(c) if c > 0 => {
                self.current = Some(c - 1);
                CursorMove::Moved
            }
            Some(_) if self.wrap => {
                self.current = Some(last);
                CursorMove::Wrapped
            }
            Some(_) => {
                self.current = None;
                CursorMove::Ended
            }
        };
        self.emit_cursor_changes(before, events);
        if outcome == CursorMove::Ended {
            events.push(self.playlist_end());
        }
        outcome
    }
}
