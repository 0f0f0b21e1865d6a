//! A small line-oriented `key: value` configuration store, grounded on the
//! teacher's original C implementation: load clears and repopulates
//! wholesale, save emits only keys that are actually set, unknown keys on
//! load are silently ignored.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Recognised configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Version,
    AudioIn,
    AudioOut,
}

impl Key {
    fn as_str(self) -> &'static str {
        match self {
            Key::Version => "version",
            Key::AudioIn => "audio_in",
            Key::AudioOut => "audio_out",
        }
    }

    fn from_str(s: &str) -> Option<Key> {
        match s {
            "version" => Some(Key::Version),
            "audio_in" => Some(Key::AudioIn),
            "audio_out" => Some(Key::AudioOut),
            _ => None,
        }
    }
}

/// In-memory configuration: only keys that have been explicitly set are
/// present.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: HashMap<Key, String>,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }

    pub fn get(&self, key: Key) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    pub fn set(&mut self, key: Key, value: Option<String>) {
        match value {
            Some(v) => {
                self.values.insert(key, v);
            }
            None => {
                self.values.remove(&key);
            }
        }
    }

    /// Parses `key: value` lines, one per line. Unknown keys are ignored.
    /// Replaces all prior values wholesale (matches `config_load`'s
    /// clear-then-repopulate, rather than merging into the existing map).
    pub fn load(path: &Path) -> Result<Config, String> {
        let text = fs::read_to_string(path).map_err(|e| e.to_string())?;

        let mut values = HashMap::new();
        for line in text.lines() {
            let Some((raw_key, raw_value)) = line.split_once(": ") else {
                continue;
            };
            if let Some(key) = Key::from_str(raw_key) {
                values.insert(key, raw_value.trim_end_matches(|c: char| c < ' ').to_string());
            }
        }

        Ok(Config { values })
    }

    /// Emits only keys that are present, one `key: value` line each.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let mut text = String::new();
        for key in [Key::Version, Key::AudioIn, Key::AudioOut] {
            if let Some(value) = self.get(key) {
                text.push_str(key.as_str());
                text.push_str(": ");
                text.push_str(value);
                text.push('\n');
            }
        }
        fs::write(path, text).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_round_trips_in_memory() {
        let mut config = Config::new();
        assert_eq!(config.get(Key::Version), None);
        config.set(Key::Version, Some("1.0".to_string()));
        assert_eq!(config.get(Key::Version), Some("1.0"));
        config.set(Key::Version, None);
        assert_eq!(config.get(Key::Version), None);
    }

    #[test]
    fn save_then_load_round_trips_through_disk() {
        let dir = std::env::temp_dir().join(format!("morse-config-test-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("morserator.conf");

        let mut config = Config::new();
        config.set(Key::Version, Some("foo".to_string()));
        config.set(Key::AudioIn, Some("bar".to_string()));
        config.set(Key::AudioOut, Some("baz".to_string()));
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.get(Key::Version), Some("foo"));
        assert_eq!(loaded.get(Key::AudioIn), Some("bar"));
        assert_eq!(loaded.get(Key::AudioOut), Some("baz"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unknown_keys_are_ignored_on_load() {
        let dir = std::env::temp_dir().join(format!("morse-config-test2-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("morserator.conf");
        fs::write(&path, "version: 1.0\nbogus_key: hello\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.get(Key::Version), Some("1.0"));

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_replaces_rather_than_merges() {
        let dir = std::env::temp_dir().join(format!("morse-config-test3-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("morserator.conf");
        fs::write(&path, "version: 2.0\n").unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.get(Key::Version), Some("2.0"));
        assert_eq!(loaded.get(Key::AudioIn), None);

        fs::remove_dir_all(&dir).ok();
    }
}
