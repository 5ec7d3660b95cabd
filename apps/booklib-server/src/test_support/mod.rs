use once_cell::sync::Lazy;
use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub(crate) mod env {
    use super::*;

    /// Every variable the server reads at startup.
    const CONFIG_KEYS: &[&str] = &[
        "BOOKLIB_BIND",
        "BOOKLIB_PORT",
        "BOOKLIB_HTTP_MAX_CONC",
        "BOOKLIB_STATE_DIR",
        "BOOKLIB_SQLITE_BUSY_MS",
        "BOOKLIB_SQLITE_CACHE_PAGES",
    ];

    /// Exclusive, defaults-only view of the booklib config environment.
    /// The snapshot taken on entry is put back on drop.
    pub(crate) struct ConfigEnv {
        _lock: MutexGuard<'static, ()>,
        snapshot: Vec<(&'static str, Option<String>)>,
    }

    pub(crate) fn clean_config() -> ConfigEnv {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let snapshot = CONFIG_KEYS
            .iter()
            .map(|&key| (key, std::env::var(key).ok()))
            .collect();
        for key in CONFIG_KEYS {
            std::env::remove_var(key);
        }
        ConfigEnv {
            _lock: lock,
            snapshot,
        }
    }

    impl ConfigEnv {
        pub(crate) fn set(&self, key: &str, value: &str) {
            assert!(
                CONFIG_KEYS.iter().any(|known| *known == key),
                "{key} is not a booklib config key"
            );
            std::env::set_var(key, value);
        }

        pub(crate) fn unset(&self, key: &str) {
            std::env::remove_var(key);
        }
    }

    impl Drop for ConfigEnv {
        fn drop(&mut self) {
            for (key, value) in &self.snapshot {
                match value {
                    Some(val) => std::env::set_var(key, val),
                    None => std::env::remove_var(key),
                }
            }
        }
    }
}
