//! lull: play binaural beats or noise/texture beds, or render them to WAV.

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use tracing::info;

use lull_core::dsp::seconds_to_frames;
use lull_engine::{BinauralParams, Engine, EngineConfig, NoiseColor, NoiseParams, TextureKind};

#[derive(Parser)]
#[command(name = "lull")]
#[command(about = "Focus sounds: binaural beats, noise colors and natural textures")]
#[command(version)]
struct Cli {
    /// Engine config file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for reproducible noise/texture buffers
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// More logging (-v debug, -vv trace); RUST_LOG wins when set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List audio output devices
    Devices,

    /// Play a binaural beat
    Binaural {
        #[command(flatten)]
        tone: BinauralArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Play a noise bed, optionally with a texture layered under it
    Noise {
        #[command(flatten)]
        bed: NoiseArgs,
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Render offline to a stereo 32-bit float WAV file
    Render {
        /// Output WAV path
        #[arg(short, long)]
        output: PathBuf,

        /// Length in seconds
        #[arg(long, default_value_t = 30.0)]
        seconds: f32,

        /// Sample rate of the file
        #[arg(long, default_value_t = 48_000)]
        sample_rate: u32,

        #[command(subcommand)]
        source: Source,
    },
}

#[derive(Subcommand)]
enum Source {
    Binaural(BinauralArgs),
    Noise(NoiseArgs),
}

#[derive(Args, Clone, Copy)]
struct BinauralArgs {
    /// Left-ear tone, Hz (200-600)
    #[arg(long, default_value_t = 250.0)]
    carrier: f32,
    /// Right ear plays carrier + beat, Hz (4-20)
    #[arg(long, default_value_t = 10.0)]
    beat: f32,
    /// Output level (0-1)
    #[arg(long, default_value_t = 0.5)]
    volume: f32,
}

impl From<BinauralArgs> for BinauralParams {
    fn from(a: BinauralArgs) -> Self {
        BinauralParams::new(a.carrier, a.beat, a.volume)
    }
}

#[derive(Args, Clone, Copy)]
struct NoiseArgs {
    /// white, pink, brown or green
    #[arg(long, default_value = "white")]
    color: NoiseColor,
    /// Noise level (0-1)
    #[arg(long, default_value_t = 0.5)]
    volume: f32,
    /// wind, rain or ocean
    #[arg(long)]
    texture: Option<TextureKind>,
    /// Texture level (0-1)
    #[arg(long, default_value_t = 0.3)]
    texture_volume: f32,
}

impl From<NoiseArgs> for NoiseParams {
    fn from(a: NoiseArgs) -> Self {
        let params = NoiseParams::new(a.color, a.volume);
        match a.texture {
            Some(kind) => params.with_texture(kind, a.texture_volume),
            None => params,
        }
    }
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Stop after this many seconds (default: until Ctrl+C)
    #[arg(long)]
    duration: Option<u64>,
    /// Output device name
    #[arg(long)]
    device: Option<String>,
    /// Preferred device sample rate
    #[arg(long)]
    sample_rate: Option<u32>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}

fn load_config(cli: &Cli) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
            toml::from_str(&text).map_err(|e| format!("invalid config {}: {e}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(&cli)?;

    match cli.command {
        Commands::Devices => list_devices(),
        Commands::Binaural { tone, output } => play(config, &output, |engine| engine.start_binaural(tone.into())),
        Commands::Noise { bed, output } => play(config, &output, |engine| engine.start_noise(bed.into())),
        Commands::Render { output, seconds, sample_rate, source } => {
            render(config, &output, seconds, sample_rate, source)
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "realtime")] {
        use std::time::Duration;

        use lull_engine::CpalBackend;

        fn list_devices() -> Result<(), Box<dyn Error>> {
            println!("Available output devices:");
            for name in lull_engine::realtime::list_output_devices()? {
                println!("- {name}");
            }
            Ok(())
        }

        fn play(
            mut config: EngineConfig,
            output: &OutputArgs,
            start: impl FnOnce(&mut Engine<CpalBackend>) -> lull_engine::EngineResult<()>,
        ) -> Result<(), Box<dyn Error>> {
            if output.device.is_some() {
                config.device.clone_from(&output.device);
            }
            if output.sample_rate.is_some() {
                config.sample_rate = output.sample_rate;
            }
            let mut engine = Engine::realtime(config);
            start(&mut engine)?;
            info!(state = ?engine.get_state(), "playing");
            hold(&mut engine, output.duration)
        }

        fn hold(engine: &mut Engine<CpalBackend>, duration: Option<u64>) -> Result<(), Box<dyn Error>> {
            match duration {
                Some(d) => {
                    info!(seconds = d, "auto-stop scheduled");
                    std::thread::sleep(Duration::from_secs(d));
                    engine.stop()?;
                    Ok(())
                }
                None => {
                    println!("Press Ctrl+C to stop…");
                    loop { std::thread::sleep(Duration::from_millis(500)); }
                }
            }
        }
    } else {
        fn list_devices() -> Result<(), Box<dyn Error>> {
            Err("built without the `realtime` feature; no audio devices".into())
        }

        fn play(
            _config: EngineConfig,
            _output: &OutputArgs,
            _start: impl FnOnce(&mut Engine<lull_engine::OfflineBackend>) -> lull_engine::EngineResult<()>,
        ) -> Result<(), Box<dyn Error>> {
            Err("built without the `realtime` feature; use `lull render`".into())
        }
    }
}

const RENDER_BLOCK: usize = 1_024;

fn render(
    config: EngineConfig,
    path: &Path,
    seconds: f32,
    sample_rate: u32,
    source: Source,
) -> Result<(), Box<dyn Error>> {
    let (mut engine, tap) = Engine::offline(config, sample_rate);
    match source {
        Source::Binaural(tone) => engine.start_binaural(tone.into())?,
        Source::Noise(bed) => engine.start_noise(bed.into())?,
    }

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| format!("failed to create {}: {e}", path.display()))?;

    let total = seconds_to_frames(seconds.max(0.0), sample_rate);
    let mut written = 0;
    let mut peak = 0.0_f32;
    while written < total {
        let n = RENDER_BLOCK.min(total - written);
        for s in tap.render(n) {
            peak = peak.max(s.abs());
            writer.write_sample(s.clamp(-1.0, 1.0))?;
        }
        written += n;
    }
    writer.finalize()?;
    engine.stop()?;

    info!(path = %path.display(), frames = total, peak, "render finished");
    Ok(())
}
