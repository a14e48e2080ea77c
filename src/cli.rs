// Command-line interface definitions for dicta
//
// Kept separate from main.rs so the argument surface can be tested
// without spinning up the daemon.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dicta")]
#[command(author, version, about = "Hotkey dictation with local speech-to-text")]
#[command(long_about = "
Dicta is a hotkey-triggered dictation tool for Linux.
Hold a hotkey to record, release to transcribe; the text lands on your
clipboard. With drafting enabled, a local LLM rewrites the spoken intent
into a polished message first.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install wl-clipboard (and ydotool for paste mode)
  4. Download a whisper model (see README)
  5. Run: dicta (to start the daemon)

USAGE:
  Hold ScrollLock (default) while speaking, release to process.
  Press Esc to cancel an in-flight dictation.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Override whisper model (tiny, base, small, medium, large-v3, large-v3-turbo)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Override hotkey (e.g., SCROLLLOCK, PAUSE, F13)
    #[arg(long, value_name = "KEY")]
    pub hotkey: Option<String>,

    /// Use toggle mode (press to start/stop) instead of push-to-talk (hold to record)
    #[arg(long)]
    pub toggle: bool,

    /// Enable drafting mode for this run (requires a running Ollama)
    #[arg(long)]
    pub draft: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Transcribe an audio file (WAV) and print the text
    Transcribe {
        /// Path to audio file
        file: std::path::PathBuf,
    },

    /// Show current configuration
    Config,

    /// Show recently delivered texts
    History {
        /// Number of entries to show
        #[arg(short = 'n', long, default_value_t = 10)]
        count: usize,

        /// Delete all history entries
        #[arg(long)]
        clear: bool,
    },

    /// Control a running daemon (compositor keybindings, scripts)
    Record {
        #[command(subcommand)]
        action: RecordAction,
    },
}

#[derive(Subcommand)]
pub enum RecordAction {
    /// Start recording (send SIGUSR1 to daemon)
    Start,
    /// Stop recording and process (send SIGUSR2 to daemon)
    Stop,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_default_command_is_none() {
        let cli = Cli::parse_from(["dicta"]);
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 0);
        assert!(!cli.toggle);
    }

    #[test]
    fn test_history_subcommand() {
        let cli = Cli::parse_from(["dicta", "history", "-n", "5"]);
        assert!(matches!(
            cli.command,
            Some(Commands::History {
                count: 5,
                clear: false
            })
        ));
    }

    #[test]
    fn test_record_subcommand() {
        let cli = Cli::parse_from(["dicta", "record", "start"]);
        assert!(matches!(
            cli.command,
            Some(Commands::Record {
                action: RecordAction::Start
            })
        ));
    }
}
