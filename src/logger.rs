use std::sync::Mutex;

use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Structured logging capability injected into the sync engine.
pub trait SyncLogger: Send + Sync {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]);

    fn debug(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::Debug, message, fields);
    }

    fn info(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::Info, message, fields);
    }

    fn warn(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::Warn, message, fields);
    }

    fn error(&self, message: &str, fields: &[(&str, &str)]) {
        self.log(Level::Error, message, fields);
    }
}

/// Forwards to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

macro_rules! emit {
    ($level:ident, $fields:ident, $message:ident) => {
        $level!(
            repo = $fields.repo,
            page = $fields.page,
            phase = $fields.phase,
            database_id = $fields.database_id,
            error = $fields.error,
            fields = $fields.rest.as_deref(),
            "{}",
            $message
        )
    };
}

impl SyncLogger for TracingLogger {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]) {
        let fields = SplitFields::from_pairs(fields);

        match level {
            Level::Debug => emit!(debug, fields, message),
            Level::Info => emit!(info, fields, message),
            Level::Warn => emit!(warn, fields, message),
            Level::Error => emit!(error, fields, message),
        }
    }
}

/// Well-known keys become their own tracing fields; the rest are rendered
/// into a single `fields` value.
#[derive(Debug, Default, PartialEq, Eq)]
struct SplitFields<'a> {
    repo: Option<&'a str>,
    page: Option<&'a str>,
    phase: Option<&'a str>,
    database_id: Option<&'a str>,
    error: Option<&'a str>,
    rest: Option<String>,
}

impl<'a> SplitFields<'a> {
    fn from_pairs(pairs: &[(&'a str, &'a str)]) -> Self {
        let mut fields = SplitFields::default();
        let mut rest = Vec::new();

        for &(key, value) in pairs {
            match key {
                "repo" => fields.repo = Some(value),
                "page" => fields.page = Some(value),
                "phase" => fields.phase = Some(value),
                "database_id" => fields.database_id = Some(value),
                "error" => fields.error = Some(value),
                _ => rest.push((key, value)),
            }
        }

        if !rest.is_empty() {
            fields.rest = Some(render_fields(&rest));
        }
        fields
    }
}

fn render_fields(fields: &[(&str, &str)]) -> String {
    fields
        .iter()
        .map(|(key, value)| format!("{}={:?}", key, value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: Level,
    pub message: String,
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Keeps every entry in memory.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    pub fn messages(&self, level: Level) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }
}

impl SyncLogger for MemoryLogger {
    fn log(&self, level: Level, message: &str, fields: &[(&str, &str)]) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(LogEntry {
                level,
                message: message.to_string(),
                fields: fields
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            });
        }
    }
}
