//! Structured Logging with Sensitive Data Redaction
//!
//! Log fields are redacted by key name before they are rendered:
//! - Seeds, mnemonics and private key material are never printed
//! - Public keys and addresses keep a short prefix and suffix
//! - Transaction ids, sighashes and signatures keep a longer prefix
//!
//! Output goes to stderr with a UTC timestamp. Debug entries are dropped
//! unless [`enable_debug`] was called.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a field value is shown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redaction {
    Plain,
    /// Only the length survives
    Secret,
    /// Address or public key: prefix and suffix
    Address,
    /// Hash-like hex: first 10 and last 6 characters
    Digest,
}

/// Key fragments and the redaction they trigger, checked in order
const REDACTION_RULES: &[(&[&str], Redaction)] = &[
    (
        &["private", "secret", "seed", "mnemonic", "passphrase", "password", "xprv", "wif"],
        Redaction::Secret,
    ),
    (&["address", "recipient", "pubkey", "public_key", "xpub"], Redaction::Address),
    (&["txid", "tx_id", "hash", "signature", "preimage", "payload"], Redaction::Digest),
];

impl Redaction {
    /// Redaction implied by a field name
    pub fn for_key(key: &str) -> Self {
        let key = key.to_lowercase();
        REDACTION_RULES
            .iter()
            .find(|(fragments, _)| fragments.iter().any(|fragment| key.contains(fragment)))
            .map(|(_, redaction)| *redaction)
            .unwrap_or(Redaction::Plain)
    }

    pub fn apply(&self, value: &str) -> String {
        match self {
            Redaction::Plain => value.to_string(),
            Redaction::Secret => redact_value(value),
            Redaction::Address => redact_address(value),
            Redaction::Digest => redact_hash(value),
        }
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field, redacted according to its key
    pub fn field(self, key: &'static str, value: impl fmt::Display) -> Self {
        self.with(key, value, Redaction::for_key(key))
    }

    /// Add a field that is always fully redacted
    pub fn redacted_field(self, key: &'static str, value: impl fmt::Display) -> Self {
        self.with(key, value, Redaction::Secret)
    }

    pub fn address_field(self, key: &'static str, address: &str) -> Self {
        self.with(key, address, Redaction::Address)
    }

    fn with(mut self, key: &'static str, value: impl fmt::Display, redaction: Redaction) -> Self {
        self.fields.push((key, redaction.apply(&value.to_string())));
        self
    }

    /// Render without the timestamp prefix
    pub fn render(&self) -> String {
        let mut out = format!("{} [{}] {}", self.level, self.module, self.message);
        for (i, (key, value)) in self.fields.iter().enumerate() {
            out.push_str(if i == 0 { " | " } else { " " });
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        eprintln!("[{}] {}", timestamp, self.render());
    }
}

fn redact_value(value: &str) -> String {
    match value.chars().count() {
        0 => "[EMPTY]".to_string(),
        1..=4 => "[REDACTED]".to_string(),
        len => format!("[REDACTED:{}chars]", len),
    }
}

/// First `head` and last `tail` characters, cut on char boundaries
fn keep_ends(value: &str, head: usize, tail: usize) -> Option<String> {
    let len = value.chars().count();
    if len <= head + tail + 3 {
        return None;
    }
    let prefix: String = value.chars().take(head).collect();
    let suffix: String = value.chars().skip(len - tail).collect();
    Some(format!("{}...{}", prefix, suffix))
}

/// Keep the first 6 and last 4 characters; CashAddr keeps its prefix too
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    let head = trimmed
        .chars()
        .position(|c| c == ':')
        .map(|colon| colon + 5)
        .unwrap_or(6);
    keep_ends(trimmed, head, 4).unwrap_or_else(|| redact_value(trimmed))
}

fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }
    keep_ends(trimmed, 10, 6).unwrap_or_else(|| trimmed.to_string())
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($level:ident, $module:expr, $msg:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::$level,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[macro_export]
macro_rules! log_debug {
    ($($args:tt)*) => { $crate::__log_at!(Debug, $($args)*) };
}

#[macro_export]
macro_rules! log_info {
    ($($args:tt)*) => { $crate::__log_at!(Info, $($args)*) };
}

#[macro_export]
macro_rules! log_warn {
    ($($args:tt)*) => { $crate::__log_at!(Warn, $($args)*) };
}

#[macro_export]
macro_rules! log_error {
    ($($args:tt)*) => { $crate::__log_at!(Error, $($args)*) };
}
