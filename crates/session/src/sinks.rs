use pixelface_core::room_api::AudioSink;
use std::collections::HashMap;

struct Entry {
    participant: String,
    sink: Box<dyn AudioSink>,
}

/// Active playback sinks, keyed by track id.
///
/// Every removal path stops the sink first and is a no-op for unknown keys, so
/// unsubscribe, disconnect and teardown may overlap freely. Dropping the
/// registry releases whatever is left.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: HashMap<String, Entry>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sink` under `key`. A sink already registered under the same
    /// key is stopped and replaced.
    pub fn insert(&mut self, key: &str, participant: &str, sink: Box<dyn AudioSink>) {
        let entry = Entry {
            participant: participant.to_string(),
            sink,
        };
        if let Some(mut old) = self.sinks.insert(key.to_string(), entry) {
            tracing::debug!("replacing audio sink {}", key);
            old.sink.stop();
        }
    }

    pub fn release(&mut self, key: &str) -> bool {
        match self.sinks.remove(key) {
            Some(mut entry) => {
                entry.sink.stop();
                tracing::info!("released audio sink {}", key);
                true
            }
            None => false,
        }
    }

    /// Releases every sink owned by `participant`. Returns how many there were.
    pub fn release_participant(&mut self, participant: &str) -> usize {
        let keys: Vec<String> = self
            .sinks
            .iter()
            .filter(|(_, entry)| entry.participant == participant)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            self.release(key);
        }
        keys.len()
    }

    pub fn release_all(&mut self) -> usize {
        let count = self.sinks.len();
        for (_, mut entry) in self.sinks.drain() {
            entry.sink.stop();
        }
        if count > 0 {
            tracing::info!("released {} audio sinks", count);
        }
        count
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sinks.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Drop for SinkRegistry {
    fn drop(&mut self) {
        self.release_all();
    }
}
