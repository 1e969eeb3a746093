//! stepdeck CLI: play a step pattern live or bounce it to WAV.
//!
//! Usage:
//!   sd-cli kick.wav snare.wav --pattern "x...x..." --pattern "....x..."
//!   sd-cli kick.wav --bpm 96 --seconds 8 --wav out.wav
//!   sd-cli kick.wav --pattern "x..." --next --pattern "x.x." --continuous
//!
//! Each `--pattern` sets the next channel's steps; `--next` starts another
//! sequence over the same samples. Without samples a built-in click plays
//! on every quarter note.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use sd_master::{
    load_config, load_wav_file, Channel, Controller, PlaybackMode, Sample, Sequence, Session, StepPattern,
    StepdeckConfig,
};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: sd-cli [sample.wav ...] [--pattern STEPS]... [--next [--pattern STEPS]...]... \
                     [--bpm N] [--seconds N] [--continuous] [--config FILE] [--wav OUT]";

const DEFAULT_STEPS: &str = "x...";

#[derive(Debug)]
struct Args {
    samples: Vec<PathBuf>,
    /// Channel patterns, one list per sequence
    sequences: Vec<Vec<String>>,
    bpm: Option<f64>,
    seconds: Option<f64>,
    continuous: bool,
    config: Option<PathBuf>,
    wav: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            samples: Vec::new(),
            sequences: vec![Vec::new()],
            bpm: None,
            seconds: None,
            continuous: false,
            config: None,
            wav: None,
        }
    }
}

fn parse_args(mut it: impl Iterator<Item = String>) -> Result<Args> {
    let mut args = Args::default();
    while let Some(arg) = it.next() {
        let mut value = |flag: &str| it.next().with_context(|| format!("{flag} needs a value"));
        match arg.as_str() {
            "--pattern" => {
                let steps = value("--pattern")?;
                if let Some(current) = args.sequences.last_mut() {
                    current.push(steps);
                }
            }
            "--next" => args.sequences.push(Vec::new()),
            "--bpm" => args.bpm = Some(value("--bpm")?.parse().context("--bpm")?),
            "--seconds" => args.seconds = Some(value("--seconds")?.parse().context("--seconds")?),
            "--config" => args.config = Some(value("--config")?.into()),
            "--wav" => args.wav = Some(value("--wav")?.into()),
            "--continuous" => args.continuous = true,
            "-h" | "--help" => bail!("{USAGE}"),
            flag if flag.starts_with("--") => bail!("unknown flag {flag}\n{USAGE}"),
            _ => args.samples.push(arg.into()),
        }
    }
    Ok(args)
}

/// 30 ms decaying 1 kHz blip.
fn click(sample_rate: u32) -> Sample {
    let frames = (sample_rate as f64 * 0.03) as usize;
    let data = (0..frames)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            ((t * 1000.0 * std::f64::consts::TAU).sin() * (1.0 - i as f64 / frames as f64)) as f32
        })
        .collect();
    Sample::new("click", sd_master::AudioBuffer::from_mono(data), sample_rate)
}

fn build_session(args: &Args) -> Result<Session> {
    let mut sources = Vec::new();
    if args.samples.is_empty() {
        sources.push(Arc::new(click(44_100)));
    }
    for path in &args.samples {
        let sample = load_wav_file(path).with_context(|| format!("loading {}", path.display()))?;
        tracing::info!("{}: {} frames at {} Hz", path.display(), sample.frames(), sample.sample_rate);
        sources.push(Arc::new(sample));
    }

    let mut sequences = args.sequences.iter().enumerate().map(|(n, patterns)| {
        let mut seq = Sequence::new(&format!("cli {}", n + 1));
        if let Some(bpm) = args.bpm {
            seq.bpm = bpm;
        }
        for (i, sample) in sources.iter().enumerate() {
            let mut ch = Channel::with_sample(&sample.name.to_string(), sample.clone());
            ch.steps = StepPattern::repeating(patterns.get(i).map_or(DEFAULT_STEPS, String::as_str));
            seq.channels.push(ch);
        }
        seq
    });

    let first = sequences.next().context("no sequence to play")?;
    let mut session = Session::new(first);
    for seq in sequences {
        session.add_sequence(seq);
    }
    if args.continuous {
        if session.sequences().len() < 2 {
            tracing::warn!("--continuous has one sequence to play; add --next to chain more");
        }
        session.set_playback_mode(PlaybackMode::Continuous);
    }
    Ok(session)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => StepdeckConfig::default(),
    };
    let seconds = args.seconds.unwrap_or(config.render.seconds);
    let session = build_session(&args)?;
    let mut ctrl = Controller::new(session, config.scheduler.clone())?;

    match &args.wav {
        Some(path) => bounce(&ctrl, path, config.render.sample_rate, seconds),
        None => play(&mut ctrl, seconds),
    }
}

fn bounce(ctrl: &Controller, path: &PathBuf, sample_rate: u32, seconds: f64) -> Result<()> {
    println!("Rendering {seconds} s to {} at {sample_rate} Hz...", path.display());
    let wav = ctrl.render_to_wav(sample_rate, seconds);
    std::fs::write(path, &wav).with_context(|| format!("writing {}", path.display()))?;
    println!("Wrote {} bytes", wav.len());
    Ok(())
}

fn play(ctrl: &mut Controller, seconds: f64) -> Result<()> {
    if !ctrl.start()? {
        bail!("playback already running");
    }
    println!("Playing for {seconds} s...");

    let until = Instant::now() + Duration::from_secs_f64(seconds.max(0.0));
    while Instant::now() < until {
        let step = ctrl.transport().current_step;
        print!("\rBar {} | Step {:02}", step / 16 + 1, step % 16 + 1);
        let _ = std::io::stdout().flush();
        std::thread::sleep(Duration::from_millis(10));
    }
    ctrl.stop();
    println!("\rStopped.          ");

    for report in ctrl.bar_reports() {
        println!("{report}");
    }
    Ok(())
}
