use clap::{ArgGroup, Parser};

use crate::types::{LogLevel, Mode};

#[derive(Parser, Debug)]
#[command(
    name = "picker-sync",
    about = "Copy photos selected in a Google Photos Picker session into Azure Blob Storage"
)]
#[command(group(
    ArgGroup::new("mode")
        .required(true)
        .args(["session_id", "session_file", "list_sessions"]),
))]
pub struct Cli {
    /// Process a specific Picker session ID (uses the stored OAuth token)
    #[arg(long)]
    pub session_id: Option<String>,

    /// Process a session descriptor stored in the container
    /// (e.g. picker-session-123456.json)
    #[arg(long)]
    pub session_file: Option<String>,

    /// List the session descriptor files stored in the container
    #[arg(long)]
    pub list_sessions: bool,

    /// OAuth token file written by the browser sign-in flow
    #[arg(long, env = "PICKER_SYNC_TOKEN_FILE", default_value = "~/.picker-sync/token.json")]
    pub token_file: String,

    /// Azure Storage configuration file
    #[arg(
        long,
        env = "PICKER_SYNC_STORAGE_CONFIG",
        default_value = "~/.picker-sync/azure-config.json"
    )]
    pub storage_config: String,

    /// Log level (RUST_LOG takes precedence when set)
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Disable progress bar
    #[arg(long)]
    pub no_progress_bar: bool,
}

impl Cli {
    /// The mode selected on the command line. clap's `mode` group guarantees
    /// exactly one of the three flags is present.
    pub fn mode(&self) -> Mode {
        if let Some(id) = &self.session_id {
            Mode::SessionId(id.clone())
        } else if let Some(name) = &self.session_file {
            Mode::SessionFile(name.clone())
        } else {
            Mode::ListSessions
        }
    }
}
