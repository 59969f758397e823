mod analysis;
mod app;
mod audio;
mod config;
mod sync;
mod trace;
mod types;
mod ui;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::info;

use crate::analysis::{estimate_period, infer_bpm, Tempo};
use crate::app::App;
use crate::audio::wav::{conformed_path, generate_timestamp};
use crate::audio::{decode_wav, process_recording, ClickOutput};
use crate::config::Config;
use crate::sync::{ClickSink, LoopSync, MonotonicClock};
use crate::trace::LogTarget;
use crate::ui::{handle_input, render_ui};

const DEFAULT_CONFIG: &str = "loopsync.yaml";

/// Longest the event loop waits for input before redrawing
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// loopsync - loop cycle clock and metronome
#[derive(Parser, Debug)]
#[command(
    version,
    about = "Terminal loop-sync tool: detects a loop's length and keeps a cycle clock and metronome on it",
    long_about = "Terminal loop-sync tool.\n\n\
                  Estimates the period of a master take by autocorrelation, infers a \
                  tempo that tiles the cycle in whole bars, and runs a cycle clock with \
                  a phase-locked metronome. Later takes can be padded to the cycle length.\n\n\
                  Configuration is loaded from loopsync.yaml by default, or use --config \
                  to specify a different file."
)]
struct Args {
    /// List available audio output devices
    #[arg(short, long)]
    list_devices: bool,

    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", default_value = DEFAULT_CONFIG)]
    config: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Estimate the loop period and tempo of a master take
    Analyze {
        /// Master take (WAV)
        wav: PathBuf,
    },

    /// Pad a take with silence to the cycle length and write it as 16-bit WAV
    Conform {
        /// Take to conform (WAV)
        wav: PathBuf,

        /// Cycle length in seconds
        #[arg(short, long)]
        duration: f64,

        /// Output path (default: <name>-conformed-<timestamp>.wav)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Run the interactive cycle clock and metronome
    Session {
        /// Master take the cycle is derived from (WAV)
        wav: PathBuf,

        /// Use this cycle length instead of estimating it
        #[arg(short, long)]
        duration: Option<f64>,
    },
}

/// Load configuration from file or use defaults
fn load_config(config_path: &str) -> Result<Config> {
    let path = Path::new(config_path);

    if !path.exists() {
        // Only the default path may be missing
        if config_path != DEFAULT_CONFIG {
            anyhow::bail!("Config file not found: {}", config_path);
        }
        return Ok(Config::default());
    }

    Config::from_file(path)
}

fn read_take(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --list-devices flag
    if args.list_devices {
        return list_devices();
    }

    let Some(command) = args.command else {
        Args::command().print_help()?;
        return Ok(());
    };

    let config = load_config(&args.config)?;

    match command {
        Command::Analyze { wav } => {
            trace::setup(log_target(&config, false))?;
            analyze(&config, &wav)
        }
        Command::Conform {
            wav,
            duration,
            output,
        } => {
            trace::setup(log_target(&config, false))?;
            conform(&wav, duration, output)
        }
        Command::Session { wav, duration } => {
            trace::setup(log_target(&config, true))?;
            session(&config, wav, duration)
        }
    }
}

/// stderr for one-shot commands; the TUI only logs to a file
fn log_target(config: &Config, interactive: bool) -> LogTarget<'_> {
    match (&config.log_file, interactive) {
        (Some(path), _) => LogTarget::File(path.as_path()),
        (None, false) => LogTarget::Stderr,
        (None, true) => LogTarget::Off,
    }
}

fn analyze(config: &Config, path: &Path) -> Result<()> {
    let raw = read_take(path)?;
    let take = decode_wav(&raw).with_context(|| format!("Failed to decode {}", path.display()))?;

    let settings = config.session_settings();
    let from_onset = take.trim_to_onset(settings.sound_threshold);
    let estimate = estimate_period(
        &from_onset.to_mono(),
        from_onset.sample_rate(),
        settings.min_loop_secs,
        settings.max_loop_secs,
        settings.accuracy,
    );

    let bpm = settings
        .bpm_override
        .unwrap_or_else(|| infer_bpm(estimate.seconds, settings.beats_per_bar));
    let tempo = Tempo::for_cycle(estimate.seconds, bpm, settings.beats_per_bar);

    println!("{}", path.display());
    println!(
        "  take:        {:.3}s, {}ch @ {}Hz",
        take.duration_secs(),
        take.num_channels(),
        take.sample_rate()
    );
    println!(
        "  period:      {:.3}s ({} samples, correlation {:.3})",
        estimate.seconds, estimate.lag_samples, estimate.correlation
    );
    println!(
        "  tempo:       {} BPM, {} beats ({}/4)",
        tempo.bpm, tempo.total_beats_in_cycle, tempo.beats_per_bar
    );
    println!("  beat length: {:.1}ms", tempo.beat_interval_secs() * 1000.0);

    Ok(())
}

fn conform(path: &Path, duration: f64, output: Option<PathBuf>) -> Result<()> {
    if !duration.is_finite() || duration < 0.0 {
        anyhow::bail!("Duration must be a non-negative number of seconds, got {}", duration);
    }

    let raw = read_take(path)?;
    let processed = process_recording(&raw, duration)
        .with_context(|| format!("Failed to process {}", path.display()))?;

    let output = output.unwrap_or_else(|| conformed_path(path, &generate_timestamp()));
    fs::write(&output, &processed.wav)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(output = %output.display(), duration = processed.duration_secs, "take conformed");
    println!("{} ({:.3}s)", output.display(), processed.duration_secs);

    Ok(())
}

fn session(config: &Config, path: PathBuf, duration: Option<f64>) -> Result<()> {
    let output = ClickOutput::open(config.devices.output.as_deref())?;
    info!(
        device = output.device_name(),
        sample_rate = output.sample_rate(),
        channels = output.channels(),
        "using output device"
    );

    let mut sync = LoopSync::new(MonotonicClock, output, config.session_settings());

    let loop_duration = match duration {
        Some(d) => {
            sync.start_sync(d)?;
            d
        }
        None => {
            let raw = read_take(&path)?;
            let take =
                decode_wav(&raw).with_context(|| format!("Failed to decode {}", path.display()))?;
            sync.establish_loop(&take)?.seconds
        }
    };

    let mut app = App::new(sync, path, loop_duration);

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run main loop
    let result = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

/// Main application loop
fn run_app<B: ratatui::backend::Backend, S: ClickSink>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> Result<()> {
    loop {
        // Fire due ticks and clicks
        app.tick();

        // Update message display (auto-clear expired messages)
        app.update_message();

        // Render UI
        terminal.draw(|frame| render_ui(frame, app))?;

        // Wake up for the next timer, but redraw at least once per frame
        let timeout = app
            .sync
            .next_deadline()
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
            .map_or(FRAME_INTERVAL, |d| d.min(FRAME_INTERVAL));
        handle_input(app, timeout)?;

        if app.should_quit() {
            break;
        }
    }

    Ok(())
}

/// List available output devices
fn list_devices() -> Result<()> {
    println!("loopsync - available devices");
    println!("============================");
    println!();

    println!("Audio Output Devices:");
    match audio::device::list_output_devices() {
        Ok(devices) => {
            if devices.is_empty() {
                println!("  No audio output devices found");
            } else {
                for device in devices {
                    let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
                    println!(
                        "  [{}] {} - {}ch @ {}Hz{}",
                        device.index,
                        device.name,
                        device.max_output_channels,
                        device.sample_rate,
                        default_marker
                    );
                }
            }
        }
        Err(e) => {
            println!("  Error: {}", e);
        }
    }

    println!();
    println!("Configuration:");
    println!("  Create a loopsync.yaml file to configure the device and session");
    println!("  Use --config <path> to specify a different config file");
    println!();
    println!("Example loopsync.yaml:");
    println!("  devices:");
    println!("    output: \"MacBook Pro Speakers\"");
    println!("  detection:");
    println!("    sound_threshold: 0.1");
    println!("    accuracy: 3");
    println!("    min_loop_seconds: 0.5");
    println!("    max_loop_seconds: 8.0");
    println!("  metronome:");
    println!("    enabled: true");
    println!("    volume: 0.5");
    println!("    beats_per_bar: 4");
    println!("  sync:");
    println!("    tick_ms: 100");
    println!("  log_file: loopsync.log");

    Ok(())
}
