//! Tokens Module
//!
//! Token substitution for string driver options.
//!
//! Supported tokens: `%APP_ROOT%`, `%TIMESTAMP%`, `%DATE_W3C%`, `%DAY%`,
//! `%MONTH%`, `%YEAR%`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

// == Token Context ==
/// Values substituted into driver options.
#[derive(Debug, Clone)]
pub struct TokenContext {
    app_root: PathBuf,
    now: DateTime<Utc>,
}

impl TokenContext {
    pub fn new(app_root: impl Into<PathBuf>) -> Self {
        Self::at(app_root, Utc::now())
    }

    /// Context frozen at `now`.
    pub fn at(app_root: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            app_root: app_root.into(),
            now,
        }
    }

    /// Token → replacement pairs.
    pub fn pairs(&self) -> [(&'static str, String); 6] {
        [
            ("%APP_ROOT%", self.app_root.display().to_string()),
            ("%TIMESTAMP%", self.now.timestamp().to_string()),
            ("%DATE_W3C%", self.now.format("%Y-%m-%dT%H:%M:%S%:z").to_string()),
            ("%DAY%", self.now.format("%d").to_string()),
            ("%MONTH%", self.now.format("%m").to_string()),
            ("%YEAR%", self.now.format("%Y").to_string()),
        ]
    }

    /// Replaces every known token in `input`.
    pub fn substitute(&self, input: &str) -> String {
        if !input.contains('%') {
            return input.to_string();
        }
        self.pairs()
            .iter()
            .fold(input.to_string(), |acc, (token, value)| acc.replace(token, value))
    }
}

impl Default for TokenContext {
    fn default() -> Self {
        let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::new(root)
    }
}
