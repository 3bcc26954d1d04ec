use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::transcribe::Transcription;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub model: String,
    pub url: String,
}

impl CacheKey {
    pub fn new(model: &str, url: &str) -> Self {
        Self {
            model: model.to_string(),
            url: url.to_string(),
        }
    }
}

/// Bounded transcription cache. When full, the oldest insertion is dropped.
pub struct TranscriptCache {
    capacity: usize,
    entries: Mutex<VecDeque<(CacheKey, Arc<Transcription>)>>,
}

impl TranscriptCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Transcription>> {
        let entries = self.entries.lock().unwrap();
        entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    pub fn insert(&self, key: CacheKey, value: Arc<Transcription>) {
        if self.capacity == 0 {
            return;
        }

        let mut entries = self.entries.lock().unwrap();
        if let Some(slot) = entries.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = value;
            return;
        }

        while entries.len() >= self.capacity {
            if let Some((evicted, _)) = entries.pop_front() {
                log::debug!("Evicting cached transcription of {}", evicted.url);
            }
        }
        entries.push_back((key, value));
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
