//! User toggles that survive restarts: auto-open, countdown delay, sound.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::core::storage::{PREFERENCES_KEY, SharedStore};

pub const DEFAULT_DELAY_SECS: u8 = 3;
pub const MIN_DELAY_SECS: u8 = 1;
pub const MAX_DELAY_SECS: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub auto_open: bool,
    pub delay_secs: u8,
    pub sound: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_open: true,
            delay_secs: DEFAULT_DELAY_SECS,
            sound: true,
        }
    }
}

pub fn clamp_delay(secs: u8) -> u8 {
    secs.clamp(MIN_DELAY_SECS, MAX_DELAY_SECS)
}

impl Preferences {
    /// Reads persisted preferences, falling back to `defaults` when absent or corrupt.
    pub fn load(store: &SharedStore, defaults: Preferences) -> Preferences {
        let loaded = match store.get(PREFERENCES_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<Preferences>(&bytes) {
                Ok(prefs) => prefs,
                Err(e) => {
                    warn!("Ignoring corrupt preferences: {}", e);
                    defaults
                }
            },
            Ok(None) => defaults,
            Err(e) => {
                warn!("Failed to read preferences: {}", e);
                defaults
            }
        };
        Preferences {
            delay_secs: clamp_delay(loaded.delay_secs),
            ..loaded
        }
    }

    pub fn save(&self, store: &SharedStore) {
        match serde_json::to_vec(self) {
            Ok(bytes) => {
                if let Err(e) = store.set(PREFERENCES_KEY, &bytes) {
                    warn!("Failed to persist preferences: {}", e);
                }
            }
            Err(e) => warn!("Failed to serialize preferences: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::storage::{KeyValueStore, MemoryStore};
    use std::rc::Rc;

    #[test]
    fn test_missing_uses_defaults() {
        let store: SharedStore = Rc::new(MemoryStore::new());
        let defaults = Preferences {
            auto_open: false,
            delay_secs: 5,
            sound: false,
        };
        assert_eq!(Preferences::load(&store, defaults), defaults);
    }

    #[test]
    fn test_save_then_load() {
        let store: SharedStore = Rc::new(MemoryStore::new());
        let prefs = Preferences {
            auto_open: false,
            delay_secs: 7,
            sound: true,
        };
        prefs.save(&store);
        assert_eq!(Preferences::load(&store, Preferences::default()), prefs);
    }

    #[test]
    fn test_corrupt_falls_back_and_delay_is_clamped() {
        let mem = MemoryStore::new();
        let store: SharedStore = Rc::new(mem.clone());
        mem.set(PREFERENCES_KEY, b"garbage").unwrap();
        assert_eq!(
            Preferences::load(&store, Preferences::default()),
            Preferences::default()
        );

        mem.set(
            PREFERENCES_KEY,
            br#"{"auto_open":true,"delay_secs":99,"sound":false}"#,
        )
        .unwrap();
        assert_eq!(
            Preferences::load(&store, Preferences::default()).delay_secs,
            MAX_DELAY_SECS
        );
    }

    #[test]
    fn test_clamp_delay() {
        assert_eq!(clamp_delay(0), 1);
        assert_eq!(clamp_delay(3), 3);
        assert_eq!(clamp_delay(11), 10);
    }
}
