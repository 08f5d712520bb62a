use crate::{
    poll::{PollOptions, WaitStrategy, DEFAULT_ATTEMPTS, DEFAULT_DELAY},
    store::{CursorMode, StoreOptions},
};
use std::{net::SocketAddr, time::Duration};

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

pub const BIND: &str = "CRABCHAT_BIND";
pub const POLL_ATTEMPTS: &str = "CRABCHAT_POLL_ATTEMPTS";
pub const POLL_DELAY_MS: &str = "CRABCHAT_POLL_DELAY_MS";
pub const POLL_WAIT: &str = "CRABCHAT_POLL_WAIT";
pub const CURSOR_MODE: &str = "CRABCHAT_CURSOR_MODE";
pub const MAX_MESSAGES: &str = "CRABCHAT_MAX_MESSAGES";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl Error {
    fn invalid(key: &'static str, value: &str, reason: impl ToString) -> Self {
        Error::InvalidValue {
            key,
            value: value.to_owned(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub store: StoreOptions,
    pub poll: PollOptions,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Missing or blank keys fall back
    /// to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let bind = get(BIND).unwrap_or_else(|| DEFAULT_BIND.to_owned());
        let bind = bind
            .trim()
            .parse::<SocketAddr>()
            .map_err(|e| Error::invalid(BIND, &bind, e))?;

        let attempts = match get(POLL_ATTEMPTS) {
            Some(value) => match value.trim().parse::<u32>() {
                Ok(0) => return Err(Error::invalid(POLL_ATTEMPTS, &value, "must be at least 1")),
                Ok(attempts) => attempts,
                Err(e) => return Err(Error::invalid(POLL_ATTEMPTS, &value, e)),
            },
            None => DEFAULT_ATTEMPTS,
        };

        let delay = match get(POLL_DELAY_MS) {
            Some(value) => value
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|e| Error::invalid(POLL_DELAY_MS, &value, e))?,
            None => DEFAULT_DELAY,
        };

        let wait = match get(POLL_WAIT) {
            Some(value) => match value.trim() {
                "wake" => WaitStrategy::WakeOnWrite,
                "fixed" => WaitStrategy::FixedInterval,
                _ => return Err(Error::invalid(POLL_WAIT, &value, "expected wake or fixed")),
            },
            None => WaitStrategy::default(),
        };

        let cursor_mode = match get(CURSOR_MODE) {
            Some(value) => match value.trim() {
                "ignore" => CursorMode::Ignore,
                "after" => CursorMode::After,
                _ => return Err(Error::invalid(CURSOR_MODE, &value, "expected ignore or after")),
            },
            None => CursorMode::default(),
        };

        let max_messages = get(MAX_MESSAGES)
            .map(|value| {
                value
                    .trim()
                    .parse::<usize>()
                    .map_err(|e| Error::invalid(MAX_MESSAGES, &value, e))
            })
            .transpose()?;

        Ok(Config {
            bind,
            store: StoreOptions {
                cursor_mode,
                max_messages,
            },
            poll: PollOptions {
                attempts,
                delay,
                wait,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.bind, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.poll.attempts, 10);
        assert_eq!(config.poll.delay, Duration::from_secs(1));
        assert_eq!(config.poll.wait, WaitStrategy::WakeOnWrite);
        assert_eq!(config.store.cursor_mode, CursorMode::Ignore);
        assert_eq!(config.store.max_messages, None);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            (BIND, "127.0.0.1:9000"),
            (POLL_ATTEMPTS, "3"),
            (POLL_DELAY_MS, "250"),
            (POLL_WAIT, "fixed"),
            (CURSOR_MODE, "after"),
            (MAX_MESSAGES, "100"),
        ])
        .unwrap();

        assert_eq!(config.bind, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.poll.attempts, 3);
        assert_eq!(config.poll.delay, Duration::from_millis(250));
        assert_eq!(config.poll.wait, WaitStrategy::FixedInterval);
        assert_eq!(config.store.cursor_mode, CursorMode::After);
        assert_eq!(config.store.max_messages, Some(100));
    }

    #[test]
    fn blank_values_use_defaults() {
        let config = config(&[(POLL_ATTEMPTS, "  "), (MAX_MESSAGES, "")]).unwrap();

        assert_eq!(config.poll.attempts, 10);
        assert_eq!(config.store.max_messages, None);
    }

    #[test]
    fn rejects_bad_values() {
        for (key, value) in [
            (BIND, "nowhere"),
            (POLL_ATTEMPTS, "0"),
            (POLL_ATTEMPTS, "ten"),
            (POLL_DELAY_MS, "-1"),
            (POLL_WAIT, "sometimes"),
            (CURSOR_MODE, "before"),
            (MAX_MESSAGES, "lots"),
        ] {
            let err = config(&[(key, value)]).unwrap_err();
            assert!(err.to_string().contains(key), "{err}");
        }
    }
}
