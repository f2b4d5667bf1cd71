// Player Piano offline renderer.
//
// Runs one engine against a manual clock for a fixed number of ticks and
// prints every event as a JSON line on stdout, optionally also writing the
// stream to a Standard MIDI File. Logs go to stderr so stdout stays
// machine-readable.
//
// Usage:
//   cargo run -p player_piano_engine --bin generate -- --seed 7 --style jungle \
//     --ticks 2000 --temperature -5 --weather-code 71 --midi jungle.mid

use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use player_piano_engine::midi::write_midi;
use player_piano_engine::{Clock, Engine, EngineConfig, ManualClock, Style};
use player_piano_protocol::WeatherReading;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "generate")]
#[command(about = "Render a Player Piano event stream offline")]
#[command(version)]
struct Cli {
    /// RNG seed; omit for a fresh stream every run
    #[arg(long)]
    seed: Option<u64>,

    /// Style to play (default, elevator, jungle, serialist, impressionist,
    /// street, haunted, marbles)
    #[arg(long, default_value = "default")]
    style: Style,

    /// Number of ticks to render
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Milliseconds between ticks
    #[arg(long, default_value_t = 120)]
    tick_ms: u64,

    /// Air temperature in °C; enables weather together with --weather-code
    #[arg(long, allow_hyphen_values = true)]
    temperature: Option<f64>,

    /// WMO weather condition code
    #[arg(long)]
    weather_code: Option<i32>,

    /// JSON engine config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the stream to this .mid file
    #[arg(long)]
    midi: Option<PathBuf>,

    /// Skip the JSON lines on stdout
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if cli.tick_ms == 0 {
        bail!("--tick-ms must be positive");
    }

    let config = match &cli.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => EngineConfig::default(),
    };

    let weather = match (cli.temperature, cli.weather_code) {
        (None, None) => None,
        (temperature, code) => Some(WeatherReading::new(
            temperature.unwrap_or(15.0),
            code.unwrap_or(0),
            "command line",
        )),
    };

    let rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let clock = ManualClock::new(0);
    let mut engine = Engine::with_parts(config, clock.clone(), rng).with_style(cli.style);

    info!(
        style = %cli.style,
        ticks = cli.ticks,
        seed = ?cli.seed,
        weather = ?weather,
        "rendering"
    );

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut recorded = Vec::new();
    for _ in 0..cli.ticks {
        clock.advance(cli.tick_ms);
        let at_ms = clock.now_ms();
        let event = engine.generate_event(weather.as_ref());
        if !cli.quiet {
            serde_json::to_writer(&mut out, &event)?;
            out.write_all(b"\n")?;
        }
        if cli.midi.is_some() {
            recorded.push((at_ms, event));
        }
    }
    let end_ms = clock.now_ms() + cli.tick_ms;
    recorded.push((end_ms, engine.all_notes_off()));
    out.flush()?;

    if let Some(path) = &cli.midi {
        write_midi(&recorded, path).with_context(|| format!("writing {}", path.display()))?;
        info!(path = %path.display(), events = recorded.len(), "wrote MIDI");
    }

    info!(
        key = %engine.key(),
        scale = ?engine.scale(),
        moods = ?engine.active_moods(),
        "finished"
    );
    Ok(())
}
