use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mod_replayer::mod_loader::ModFileLoader;
use mod_replayer::{ClockRegion, LoadSummary, PlayerConfig};

/// Play ProTracker M.K. modules
#[derive(Parser, Debug)]
#[command(name = "mod-replayer", version, about)]
struct Args {
    /// Module file to play
    file: PathBuf,

    /// JSON player configuration
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Use the PAL clock instead of NTSC
    #[arg(long)]
    pal: bool,

    /// Output sample rate in Hz
    #[arg(long, value_name = "HZ")]
    sample_rate: Option<u32>,

    /// Mute a channel (1-4); may be repeated
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u8).range(1..=4))]
    mute: Vec<u8>,

    /// Print module information and exit
    #[arg(long)]
    info: bool,

    /// Stop after this many seconds
    #[arg(long, value_name = "SECS")]
    duration: Option<f64>,
}

fn build_config(args: &Args) -> Result<PlayerConfig> {
    let mut config = match &args.config {
        Some(path) => PlayerConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if args.pal {
        config.clock = ClockRegion::Pal;
    }
    if let Some(rate) = args.sample_rate {
        config.sample_rate = rate;
    }
    config.validate().context("invalid player configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;

    let module = ModFileLoader::load(&args.file)
        .with_context(|| format!("failed to load {}", args.file.display()))?;
    let summary = LoadSummary::new(&module, &config);
    println!("{}\n", summary.format_info());

    if args.info {
        return Ok(());
    }

    play(module, config, &args)
}

#[cfg(not(feature = "streaming"))]
fn play(_module: mod_replayer::Module, _config: PlayerConfig, _args: &Args) -> Result<()> {
    eprintln!(
        "Playback requires the \"streaming\" feature. Rebuild with `--features streaming` to enable audio output."
    );
    Ok(())
}

#[cfg(feature = "streaming")]
fn play(module: mod_replayer::Module, config: PlayerConfig, args: &Args) -> Result<()> {
    use std::io::BufRead;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use mod_replayer::{AudioDevice, Sequencer, StreamConfig};

    let mut sequencer =
        Sequencer::new(Arc::new(module), config).context("failed to create sequencer")?;
    for &channel in &args.mute {
        sequencer
            .mixer_mut()
            .set_channel_mute(usize::from(channel - 1), true);
    }

    let tick_samples = sequencer.samples_per_tick();
    let stream_config = StreamConfig::for_backlog(
        config.sample_rate,
        config.backlog_ticks as usize * tick_samples,
        tick_samples,
    );
    println!("Streaming Configuration:");
    println!("  Sample rate: {} Hz", stream_config.sample_rate);
    println!(
        "  Buffer size: {} samples ({:.1}ms latency)",
        stream_config.ring_buffer_size,
        stream_config.latency_ms()
    );

    let mut device = AudioDevice::open(stream_config, config.sample_format)
        .context("failed to open audio device")?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                match line {
                    Ok(line) if line.trim().eq_ignore_ascii_case("q") => {
                        stop.store(true, Ordering::Relaxed);
                        return;
                    }
                    Ok(_) => {}
                    Err(_) => return,
                }
            }
        });
    }
    if let Some(secs) = args.duration {
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            std::thread::sleep(Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX));
            stop.store(true, Ordering::Relaxed);
        });
    }

    println!("\nPlaying. Type q and press Enter to quit.\n");
    let playback_start = Instant::now();
    sequencer
        .run(&mut device, &stop)
        .context("playback failed")?;
    device.finish();

    let stats = device.stream().get_stats();
    println!("\n=== Playback Statistics ===");
    println!(
        "Duration:          {:.2} seconds",
        playback_start.elapsed().as_secs_f32()
    );
    println!("Samples written:   {}", stats.samples_written);
    println!("Overrun events:    {}", stats.overrun_count);
    println!("Ticks rendered:    {}", sequencer.ticks_rendered());

    Ok(())
}
