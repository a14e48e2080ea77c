//! Dicta - hotkey dictation with local speech-to-text and AI drafting
//!
//! Run with `dicta` or `dicta daemon` to start the daemon.
//! Use `dicta transcribe <file>` to transcribe an audio file.
//! Use `dicta record start/stop` to drive a running daemon externally.

use clap::Parser;
use dicta::cli::{Cli, Commands, RecordAction};
use dicta::config::{self, ActivationMode, Config};
use dicta::orchestrator::Orchestrator;
use dicta::transcribe;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("dicta={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(model) = cli.model {
        config.model.name = model;
    }
    if let Some(hotkey) = cli.hotkey {
        config.hotkey.key = hotkey;
    }
    if cli.toggle {
        config.hotkey.mode = ActivationMode::Toggle;
    }
    if cli.draft {
        config.generation.enabled = true;
    }
    config.validate()?;

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut orchestrator = Orchestrator::new(config);
            orchestrator.run().await?;
        }

        Commands::Transcribe { file } => {
            transcribe_file(&config, &file)?;
        }

        Commands::Config => {
            show_config(&config);
        }

        Commands::History { count, clear } => {
            show_history(&config, count, clear)?;
        }

        Commands::Record { action } => {
            run_record(action)?;
        }
    }

    Ok(())
}

/// Transcribe an audio file and print the text
fn transcribe_file(config: &Config, path: &Path) -> anyhow::Result<()> {
    use hound::WavReader;

    println!("Loading audio file: {:?}", path);

    let reader = WavReader::open(path)?;
    let spec = reader.spec();

    println!(
        "Audio format: {} Hz, {} channel(s), {:?}",
        spec.sample_rate, spec.channels, spec.sample_format
    );

    // Convert samples to f32
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_val = int_sample_scale(spec.bits_per_sample);
            reader
                .into_samples::<i32>()
                .filter_map(|s| s.ok())
                .map(|s| s as f32 / max_val)
                .collect()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .filter_map(|s| s.ok())
            .collect(),
    };

    // Mix to mono if stereo
    let mono_samples: Vec<f32> = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
            .collect()
    } else {
        samples
    };

    // Resample to 16kHz if needed
    let final_samples = if spec.sample_rate != 16000 {
        println!("Resampling from {} Hz to 16000 Hz...", spec.sample_rate);
        dicta::audio::cpal_capture::resample(&mono_samples, spec.sample_rate, 16000)
    } else {
        mono_samples
    };

    println!(
        "Processing {} samples ({:.2}s)...",
        final_samples.len(),
        final_samples.len() as f32 / 16000.0
    );

    let transcriber = transcribe::create_transcriber(&config.model)?;
    let hint = config.model.language.model_hint();
    let result = transcriber.transcribe(&final_samples, hint)?;

    println!("\nLanguage: {}", result.language);
    println!("{}", dicta::text::normalize_transcript(&result.text));
    Ok(())
}

/// Full-scale value for signed integer samples of the given width.
/// Computed in floating point; a plain i32 shift overflows at 32 bits.
fn int_sample_scale(bits_per_sample: u16) -> f32 {
    2f32.powi(bits_per_sample as i32 - 1)
}

/// Show or clear the delivery history
fn show_history(config: &Config, count: usize, clear: bool) -> anyhow::Result<()> {
    use dicta::history::History;

    let mut history = History::load(config.history_file(), config.history.max_entries);

    if clear {
        history.clear()?;
        println!("History cleared");
        return Ok(());
    }

    if history.is_empty() {
        println!("No history entries");
        return Ok(());
    }

    for entry in history.recent(count) {
        println!(
            "[{}] ({}, {:?})",
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.language,
            entry.mode
        );
        println!("  {}", entry.text);
    }

    Ok(())
}

/// Show current configuration
fn show_config(config: &Config) {
    println!("Current Configuration\n");
    println!("=====================\n");

    println!("[hotkey]");
    println!("  key = {:?}", config.hotkey.key);
    println!("  modifiers = {:?}", config.hotkey.modifiers);
    println!("  stop_key = {:?}", config.hotkey.stop_key);
    println!("  cancel_key = {:?}", config.hotkey.cancel_key);
    println!("  mode = {:?}", config.hotkey.mode);
    println!("  enabled = {}", config.hotkey.enabled);

    println!("\n[audio]");
    println!("  device = {:?}", config.audio.device);
    println!("  sample_rate = {}", config.audio.sample_rate);
    println!("  max_duration_secs = {}", config.audio.max_duration_secs);
    println!("  min_duration_ms = {}", config.audio.min_duration_ms);

    println!("\n[model]");
    println!("  name = {:?}", config.model.name);
    println!("  language = {:?}", config.model.language);
    println!("  threads = {:?}", config.model.threads);

    println!("\n[generation]");
    println!("  enabled = {}", config.generation.enabled);
    println!("  provider = {:?}", config.generation.provider);
    println!("  model = {:?}", config.generation.model);
    println!("  url = {:?}", config.generation.url);
    println!("  timeout_secs = {}", config.generation.timeout_secs);

    println!("\n[delivery]");
    println!("  mode = {:?}", config.delivery.mode);

    println!("\n[history]");
    println!("  enabled = {}", config.history.enabled);
    println!("  max_entries = {}", config.history.max_entries);
    println!("  file = {:?}", config.history_file());

    println!("\nmode = {:?}", config.mode());
    if let Some(path) = Config::default_path() {
        println!("config path = {:?}", path);
    }
    println!("models dir = {:?}", Config::models_dir());
}

/// Signal a running daemon via its PID file
#[cfg(target_os = "linux")]
fn run_record(action: RecordAction) -> anyhow::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    let pid_path = Config::runtime_dir().join("pid");
    let pid_str = std::fs::read_to_string(&pid_path).map_err(|_| {
        anyhow::anyhow!(
            "No running daemon found (missing {:?}). Start one with: dicta",
            pid_path
        )
    })?;
    let pid: i32 = pid_str.trim().parse()?;

    let signal = match action {
        RecordAction::Start => Signal::SIGUSR1,
        RecordAction::Stop => Signal::SIGUSR2,
    };

    kill(Pid::from_raw(pid), signal)
        .map_err(|e| anyhow::anyhow!("Failed to signal daemon (pid {}): {}", pid, e))?;

    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn run_record(_action: RecordAction) -> anyhow::Result<()> {
    anyhow::bail!("'dicta record' is only supported on Linux")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_sample_scale() {
        assert_eq!(int_sample_scale(16), 32768.0);
        assert_eq!(int_sample_scale(24), 8_388_608.0);
        // 32-bit WAVs must not overflow the scale computation
        assert_eq!(int_sample_scale(32), 2_147_483_648.0);
    }
}
