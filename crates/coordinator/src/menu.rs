//! The coordinator's context menu entries.

use std::sync::Arc;

use parking_lot::Mutex;
use shared::domain::MenuId;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuContext {
    All,
    Image,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: MenuId,
    pub title: String,
    pub contexts: MenuContext,
}

#[derive(Clone)]
pub struct MenuRegistry {
    items: Arc<Mutex<Vec<MenuItem>>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for MenuRegistry {
    fn default() -> Self {
        Self {
            items: Arc::default(),
            changes: Arc::new(watch::channel(0).0),
        }
    }
}

impl MenuRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remove_all(&self) {
        self.items.lock().clear();
        self.bump();
    }

    /// An item with the same id is replaced.
    pub fn create(&self, item: MenuItem) {
        {
            let mut items = self.items.lock();
            items.retain(|existing| existing.id != item.id);
            items.push(item);
        }
        self.bump();
    }

    pub fn contains(&self, id: &MenuId) -> bool {
        self.items.lock().iter().any(|item| &item.id == id)
    }

    pub fn items(&self) -> Vec<MenuItem> {
        self.items.lock().clone()
    }

    pub async fn wait_for(&self, id: &MenuId) {
        let mut changes = self.changes.subscribe();
        while !self.contains(id) {
            if changes.changed().await.is_err() {
                return;
            }
        }
    }

    fn bump(&self) {
        self.changes.send_modify(|revision| *revision += 1);
    }
}
