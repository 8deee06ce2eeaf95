#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// What a single invocation operates on. Exactly one is selected per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Print the session descriptor files stored in the container.
    ListSessions,
    /// Transfer a session by ID using the stored OAuth credential.
    SessionId(String),
    /// Transfer the session described by a descriptor blob.
    SessionFile(String),
}
