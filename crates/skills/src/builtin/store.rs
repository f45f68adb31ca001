//! A tiny single-writer JSON-array file store shared by the note and task
//! skills — grounded in shape on `ai_tools/ai_task_manager.py`'s JSON
//! persistence, generalized to any serde-able record type.

use std::path::PathBuf;

use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};

pub struct JsonListStore<T> {
    path: PathBuf,
    items: Mutex<Vec<T>>,
}

impl<T> JsonListStore<T>
where
    T: Serialize + DeserializeOwned + Clone,
{
    pub fn load(path: PathBuf) -> Self {
        let items = std::fs::read_to_string(&path)
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default();
        Self { path, items: Mutex::new(items) }
    }

    pub fn list(&self) -> Vec<T> {
        self.items.lock().clone()
    }

    pub fn push(&self, item: T) {
        let mut items = self.items.lock();
        items.push(item);
        let _ = self.flush(&items);
    }

    pub fn update<F: FnOnce(&mut T) -> bool>(&self, pred: impl Fn(&T) -> bool, f: F) -> bool {
        let mut items = self.items.lock();
        let Some(item) = items.iter_mut().find(|i| pred(i)) else { return false };
        let applied = f(item);
        if applied {
            let _ = self.flush(&items);
        }
        applied
    }

    fn flush(&self, items: &[T]) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(items).unwrap_or_default();
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)
    }
}
