//! Tracker configuration.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

/// How the fresh snapshot is fetched relative to the tracker lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshMode {
    /// Hold the lock across the fetch.
    ///
    /// Before and after are compared atomically with respect to other joins
    /// of the guild, at the cost of serializing every join behind one fetch.
    #[default]
    HoldLock,

    /// Copy the stored snapshot, release, fetch, re-acquire, compare, store.
    ///
    /// Joins no longer wait on each other's fetch, but two joins in flight at
    /// once may diff against the same "before" and report overlapping deltas.
    CopyThenRelease,
}

/// When outcome callbacks run relative to the tracker lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Run callbacks inside the critical section. Callback execution is
    /// serialized per guild, and a slow callback delays the next join.
    #[default]
    InsideLock,

    /// Release the lock first, then run callbacks. Callbacks of different
    /// joins may then run concurrently or out of order.
    AfterRelease,
}

impl FromStr for RefreshMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hold-lock" => Ok(Self::HoldLock),
            "copy-then-release" => Ok(Self::CopyThenRelease),
            other => Err(Error::Config(format!("unknown refresh mode: {other}"))),
        }
    }
}

impl FromStr for DispatchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "inside-lock" => Ok(Self::InsideLock),
            "after-release" => Ok(Self::AfterRelease),
            other => Err(Error::Config(format!("unknown dispatch mode: {other}"))),
        }
    }
}

impl fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HoldLock => write!(f, "hold-lock"),
            Self::CopyThenRelease => write!(f, "copy-then-release"),
        }
    }
}

impl fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsideLock => write!(f, "inside-lock"),
            Self::AfterRelease => write!(f, "after-release"),
        }
    }
}

/// Configuration shared by every tracker of a registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    /// Lock discipline around the snapshot fetch.
    pub refresh_mode: RefreshMode,

    /// Lock discipline around outcome callbacks.
    pub dispatch_mode: DispatchMode,

    /// Upper bound on one snapshot fetch.
    /// An elapsed timeout is reported as [`RetrievalError::Timeout`](crate::RetrievalError::Timeout).
    pub retrieval_timeout: Option<Duration>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            refresh_mode: RefreshMode::default(),
            dispatch_mode: DispatchMode::default(),
            retrieval_timeout: Some(Duration::from_secs(10)),
        }
    }
}

impl TrackerConfig {
    /// Read overrides from `HERALD_REFRESH_MODE`, `HERALD_DISPATCH_MODE` and
    /// `HERALD_RETRIEVAL_TIMEOUT_MS` (`0` disables the timeout).
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(mode) = lookup("HERALD_REFRESH_MODE") {
            config.refresh_mode = mode.trim().parse()?;
        }
        if let Some(mode) = lookup("HERALD_DISPATCH_MODE") {
            config.dispatch_mode = mode.trim().parse()?;
        }
        if let Some(ms) = lookup("HERALD_RETRIEVAL_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("invalid HERALD_RETRIEVAL_TIMEOUT_MS: {ms}")))?;
            config.retrieval_timeout = (ms > 0).then(|| Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Set the refresh mode.
    #[must_use]
    pub fn with_refresh_mode(mut self, mode: RefreshMode) -> Self {
        self.refresh_mode = mode;
        self
    }

    /// Set the dispatch mode.
    #[must_use]
    pub fn with_dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.dispatch_mode = mode;
        self
    }

    /// Set the retrieval timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.retrieval_timeout = Some(timeout);
        self
    }

    /// Disable the retrieval timeout.
    #[must_use]
    pub fn without_timeout(mut self) -> Self {
        self.retrieval_timeout = None;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_hold_the_lock() {
        let config = TrackerConfig::default();
        assert_eq!(config.refresh_mode, RefreshMode::HoldLock);
        assert_eq!(config.dispatch_mode, DispatchMode::InsideLock);
        assert_eq!(config.retrieval_timeout, Some(Duration::from_secs(10)));
    }

    #[test]
    fn builder() {
        let config = TrackerConfig::default()
            .with_refresh_mode(RefreshMode::CopyThenRelease)
            .with_dispatch_mode(DispatchMode::AfterRelease)
            .without_timeout();
        assert_eq!(config.refresh_mode, RefreshMode::CopyThenRelease);
        assert_eq!(config.dispatch_mode, DispatchMode::AfterRelease);
        assert_eq!(config.retrieval_timeout, None);

        let config = config.with_timeout(Duration::from_millis(5));
        assert_eq!(config.retrieval_timeout, Some(Duration::from_millis(5)));
    }

    #[test]
    fn env_overrides() {
        let config = TrackerConfig::from_lookup(lookup(&[
            ("HERALD_REFRESH_MODE", "copy-then-release"),
            ("HERALD_DISPATCH_MODE", " after-release "),
            ("HERALD_RETRIEVAL_TIMEOUT_MS", "250"),
        ]))
        .unwrap();
        assert_eq!(config.refresh_mode, RefreshMode::CopyThenRelease);
        assert_eq!(config.dispatch_mode, DispatchMode::AfterRelease);
        assert_eq!(config.retrieval_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn env_zero_timeout_disables() {
        let config = TrackerConfig::from_lookup(lookup(&[("HERALD_RETRIEVAL_TIMEOUT_MS", "0")])).unwrap();
        assert_eq!(config.retrieval_timeout, None);
    }

    #[test]
    fn env_rejects_garbage() {
        assert!(matches!(
            TrackerConfig::from_lookup(lookup(&[("HERALD_REFRESH_MODE", "sometimes")])),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            TrackerConfig::from_lookup(lookup(&[("HERALD_RETRIEVAL_TIMEOUT_MS", "soon")])),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn mode_display_round_trips_through_parse() {
        for mode in [RefreshMode::HoldLock, RefreshMode::CopyThenRelease] {
            assert_eq!(mode.to_string().parse::<RefreshMode>().unwrap(), mode);
        }
        for mode in [DispatchMode::InsideLock, DispatchMode::AfterRelease] {
            assert_eq!(mode.to_string().parse::<DispatchMode>().unwrap(), mode);
        }
    }
}
