//! # Resonance - Deep Voice Trainer CLI
//!
//! Terminal front end for the resonance scoring core. It captures recording
//! windows, asks the core for a score record per window and renders it.
//!
//! ## Architecture
//! - **Single-shot modes** (`analyze`, `drill`): blocking capture, one record per window
//! - **Live mode**: the input stream callback produces frames, the main thread
//!   consumes them through a crossbeam channel and owns the session state
//! - **Progress**: perfect drill attempts are appended to a JSON-lines log

mod history;
mod milestones;
mod prompts;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use resonance_core::audio::{self, DeviceSource, FRAME_SIZE};
use resonance_core::config::DEFAULT_PRESET;
use resonance_core::source::{AudioSource, CaptureError, SimulatedSource, StreamSource, WavSource};
use milestones::Milestone;
use prompts::PromptRotation;
use resonance_core::{Engine, EngineConfig, ScoreRecord};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tracing_subscriber::EnvFilter;

/// Windows used for drill prompts.
const WORD_WINDOW: Duration = Duration::from_secs(2);
const SENTENCE_WINDOW: Duration = Duration::from_secs(5);

/// Attempts allowed per drill prompt before moving on.
const CHANCES_PER_PROMPT: usize = 5;

/// Frames buffered between the stream callback and the live loop.
const LIVE_CHANNEL_CAPACITY: usize = 64;

/// How long each sentence stays up during a live session.
const LIVE_PROMPT_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Parser, Debug)]
#[command(name = "resonance")]
#[command(about = "Scores deep-voice resonance from short microphone recordings")]
struct Args {
    /// Built-in calibration preset.
    #[arg(long, global = true, default_value = DEFAULT_PRESET)]
    preset: String,

    /// JSON calibration file; overrides --preset.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print records as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a single recording window.
    Analyze {
        /// Window length in seconds; defaults to the calibration's.
        #[arg(long)]
        duration: Option<f32>,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Practice prompts; perfect attempts are logged.
    Drill {
        #[arg(long, default_value_t = 10)]
        attempts: usize,
        /// Every metric must reach this score for an attempt to count.
        #[arg(long, default_value_t = 85)]
        target: u8,
        #[arg(long, default_value = "progress.jsonl")]
        history: PathBuf,
        #[arg(long, default_value = "words.json")]
        words: PathBuf,
        /// Which prompts from the word list to practice.
        #[arg(long, value_enum, default_value_t = PromptKind::All)]
        kind: PromptKind,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Continuous scoring from the microphone until the session timer runs out.
    Live {
        #[arg(long, default_value_t = 1.0)]
        minutes: f32,
        /// Samples per streamed frame.
        #[arg(long, default_value_t = FRAME_SIZE)]
        frame: usize,
        /// Word list supplying the sentences to read aloud.
        #[arg(long, default_value = "words.json")]
        words: PathBuf,
    },
    /// Summarize the progress log.
    Stats {
        #[arg(long, default_value = "progress.jsonl")]
        history: PathBuf,
    },
    /// List the built-in calibration presets.
    Presets,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PromptKind {
    All,
    /// Single words only.
    Words,
    /// Sentences of more than three words.
    Sentences,
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Read windows from a WAV file instead of the microphone.
    #[arg(long, conflicts_with = "simulate")]
    wav: Option<PathBuf>,

    /// Use a synthetic voice instead of the microphone.
    #[arg(long)]
    simulate: bool,

    /// Seed for --simulate; random when omitted.
    #[arg(long, requires = "simulate")]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let config = load_config(&args)?;
    tracing::info!(
        preset = %config.name,
        sample_rate = config.sample_rate,
        window_secs = config.duration_secs,
        "calibration loaded"
    );
    let engine = Engine::new(config).context("invalid calibration")?;

    match args.command {
        Command::Analyze { duration, input } => run_analyze(&engine, duration, &input, args.json),
        Command::Drill {
            attempts,
            target,
            history,
            words,
            kind,
            input,
        } => {
            let prompt_list = select_prompts(prompts::load(&words), kind);
            let mut source = open_source(&input, engine.config());
            let settings = DrillSettings {
                attempts,
                target,
                json: args.json,
            };
            let results = run_drill(&engine, source.as_mut(), &prompt_list, &settings, &history)?;
            let mastered = results.iter().filter(|a| a.mastered).count();
            eprintln!("Mastered {mastered} of {attempts} attempts.");
            Ok(())
        }
        Command::Live {
            minutes,
            frame,
            words,
        } => {
            let sentences = prompts::sentences(&prompts::load(&words));
            run_live(&engine, minutes, frame, sentences, args.json)
        }
        Command::Stats { history } => run_stats(&history),
        Command::Presets => run_presets(),
    }
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn load_config(args: &Args) -> Result<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::load(path),
        None => EngineConfig::preset(&args.preset).with_context(|| {
            let known: Vec<_> = EngineConfig::preset_names().collect();
            format!("unknown preset '{}', expected one of {}", args.preset, known.join(", "))
        }),
    }
}

fn open_source(input: &InputArgs, config: &EngineConfig) -> Box<dyn AudioSource> {
    if let Some(path) = &input.wav {
        return Box::new(WavSource::new(path));
    }
    if input.simulate {
        let seed = input.seed.unwrap_or_else(clock_seed);
        tracing::info!(seed, "using simulated voice");
        return Box::new(SimulatedSource::new(config.sample_rate, seed));
    }
    Box::new(DeviceSource::new(config.sample_rate))
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

fn run_analyze(engine: &Engine, duration: Option<f32>, input: &InputArgs, json: bool) -> Result<()> {
    let window = match duration {
        Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f32(secs),
        Some(secs) => anyhow::bail!("--duration must be a positive number of seconds, got {secs}"),
        None => engine.config().window_duration(),
    };
    let mut source = open_source(input, engine.config());
    let mut session = engine.session();

    eprintln!("Listening for {:.1}s...", window.as_secs_f32());
    let record = engine.analyze_capture(&mut session, source.as_mut(), window);
    print_record(&record, None, json)
}

#[derive(Debug, Clone, Copy)]
struct DrillSettings {
    attempts: usize,
    /// Every metric must reach this score for an attempt to count.
    target: u8,
    json: bool,
}

/// One recorded drill attempt.
#[derive(Debug, Clone, PartialEq)]
struct DrillAttempt {
    prompt: String,
    /// 1-based, reset whenever the drill moves to the next prompt.
    chance: usize,
    mastered: bool,
}

/// Cycles through `prompt_list`, moving on after a mastered attempt or after
/// [`CHANCES_PER_PROMPT`] misses. Mastered attempts are appended to the log.
fn run_drill(
    engine: &Engine,
    source: &mut dyn AudioSource,
    prompt_list: &[String],
    settings: &DrillSettings,
    history_path: &Path,
) -> Result<Vec<DrillAttempt>> {
    if prompt_list.is_empty() {
        anyhow::bail!("no prompts to practice");
    }
    let mut session = engine.session();
    let mut results = Vec::with_capacity(settings.attempts);

    let mut index = 0;
    let mut chance = 1;

    for attempt in 1..=settings.attempts {
        let prompt = &prompt_list[index % prompt_list.len()];
        let window = if prompts::is_sentence(prompt) {
            SENTENCE_WINDOW
        } else {
            WORD_WINDOW
        };

        eprintln!(
            "[{attempt}/{}] chance {chance}/{CHANCES_PER_PROMPT}, say: \"{prompt}\" ({}s)",
            settings.attempts,
            window.as_secs()
        );
        let record = engine.analyze_capture(&mut session, source, window);
        print_record(&record, Some(prompt.as_str()), settings.json)?;

        let mastered = record.all_at_least(settings.target);
        if mastered {
            let entry = history::HistoryEntry::now(Some(prompt.clone()), record);
            history::append(history_path, &entry)?;
            tracing::info!(prompt = %prompt, alpha = record.alpha, "prompt mastered");
        }
        results.push(DrillAttempt {
            prompt: prompt.clone(),
            chance,
            mastered,
        });

        if mastered || chance >= CHANCES_PER_PROMPT {
            index += 1;
            chance = 1;
        } else {
            chance += 1;
        }
    }

    Ok(results)
}

fn select_prompts(all: Vec<String>, kind: PromptKind) -> Vec<String> {
    let selected = match kind {
        PromptKind::All => return all,
        PromptKind::Words => prompts::words(&all),
        PromptKind::Sentences => prompts::sentences(&all),
    };
    if selected.is_empty() {
        tracing::warn!(?kind, "word list has no matching prompts, using all of them");
        all
    } else {
        selected
    }
}

fn run_live(
    engine: &Engine,
    minutes: f32,
    frame: usize,
    sentences: Vec<String>,
    json: bool,
) -> Result<()> {
    if !(minutes.is_finite() && minutes > 0.0) {
        anyhow::bail!("--minutes must be positive, got {minutes}");
    }
    let session_length = Duration::from_secs_f32(minutes * 60.0);
    let window = engine.config().window_duration();

    let (tx, rx) = crossbeam_channel::bounded(LIVE_CHANNEL_CAPACITY);
    let (stream, rate) = audio::start_stream(tx, engine.config().sample_rate, frame)
        .context("starting live input stream")?;
    let mut source = StreamSource::new(rx, rate, window + Duration::from_secs(2));
    let mut session = engine.session();

    let started = Instant::now();
    let mut rotation = PromptRotation::new(sentences, LIVE_PROMPT_INTERVAL, started);
    let mut latest: Option<ScoreRecord> = None;
    let mut windows = 0usize;

    eprintln!("Say: \"{}\"", rotation.current());

    while started.elapsed() < session_length {
        let buffer = match source.capture(window) {
            Ok(buffer) => buffer,
            Err(err @ (CaptureError::Exhausted | CaptureError::Timeout(_))) => {
                tracing::warn!(%err, "live input stopped");
                break;
            }
            Err(err) => return Err(err).context("reading live input"),
        };
        windows += 1;

        let record = engine.analyze(&mut session, &buffer);
        // Silent windows keep the last voiced result on screen.
        if record.speech_detected {
            print_record(&record, Some(rotation.current()), json)?;
            latest = Some(record);
        } else {
            tracing::debug!("silent window");
        }
        if let Some(next) = rotation.advance(Instant::now()) {
            eprintln!("Say: \"{next}\"");
        }

        let remaining = session_length.saturating_sub(started.elapsed());
        tracing::debug!(remaining_secs = remaining.as_secs(), windows, "live session");
    }
    drop(stream);

    let Some(record) = latest else {
        eprintln!("Session finished after {windows} windows, no voice detected.");
        return Ok(());
    };
    eprintln!("Session finished after {windows} windows, last alpha {}.", record.alpha);
    match Milestone::reached(&record) {
        Some(milestone) => eprintln!("{milestone}"),
        None => eprintln!(
            "No milestone yet: lowest metric {}, level 1 needs {}.",
            milestones::lowest_metric(&record),
            milestones::LEVEL_ONE_THRESHOLD
        ),
    }
    Ok(())
}

fn run_stats(history_path: &Path) -> Result<()> {
    let entries = history::load(history_path)?;
    let Some(summary) = history::summary(&entries) else {
        println!("No training data found. Complete some drills to see your stats.");
        return Ok(());
    };

    println!("Prompts mastered: {}", summary.count);
    println!("Mastery:          {}", milestones::mastery_status(summary.count));
    println!("Average alpha:    {:.0}", summary.mean_alpha);
    println!("Peak alpha:       {}", summary.peak_alpha);
    println!(
        "Profile:          sub100 {:.0}  chest {:.0}  gravel {:.0}  belly {:.0}",
        summary.mean_sub100, summary.mean_chest, summary.mean_gravel, summary.mean_belly
    );
    Ok(())
}

fn run_presets() -> Result<()> {
    for name in EngineConfig::preset_names() {
        if let Some(config) = EngineConfig::preset(name) {
            println!("{}", serde_json::to_string(&config)?);
        }
    }
    Ok(())
}

fn print_record(record: &ScoreRecord, prompt: Option<&str>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(record)?);
        return Ok(());
    }
    if !record.speech_detected {
        println!("No voice detected.");
        return Ok(());
    }

    let mut line = String::new();
    if let Some(prompt) = prompt {
        line.push_str(&format!("{prompt:<24} "));
    }
    for (name, value) in record.metrics() {
        line.push_str(&format!("{name} {value:>3}  "));
    }
    println!("{}", line.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use resonance_core::AudioBuffer;
    use resonance_core::source::FixtureSource;
    use std::f64::consts::PI;

    fn lab_engine() -> Engine {
        Engine::new(EngineConfig::preset("lab").unwrap()).unwrap()
    }

    fn silence() -> FixtureSource {
        FixtureSource::new(AudioBuffer::new(vec![0.0; 44100], 44100))
    }

    /// One second of tones in the belly/sub-bass, chest and gravel bands.
    fn full_voice() -> FixtureSource {
        let samples = (0..44100)
            .map(|i| {
                let t = i as f64 / 44100.0;
                [55.0, 200.0, 4000.0]
                    .iter()
                    .map(|f| 0.2 * (2.0 * PI * f * t).sin())
                    .sum::<f64>() as f32
            })
            .collect();
        FixtureSource::new(AudioBuffer::new(samples, 44100))
    }

    /// Plays a fixed sequence of sources, one window each.
    struct Takes {
        takes: Vec<FixtureSource>,
        next: usize,
    }

    impl AudioSource for Takes {
        fn capture(&mut self, duration: Duration) -> Result<AudioBuffer, CaptureError> {
            let take = self.takes.get_mut(self.next).ok_or(CaptureError::Exhausted)?;
            self.next += 1;
            take.capture(duration)
        }
    }

    fn drill_prompts() -> Vec<String> {
        vec!["GROUND".to_owned(), "BOOM".to_owned()]
    }

    fn settings(attempts: usize) -> DrillSettings {
        DrillSettings {
            attempts,
            target: 85,
            json: true,
        }
    }

    fn schedule(results: &[DrillAttempt]) -> Vec<(&str, usize)> {
        results.iter().map(|a| (a.prompt.as_str(), a.chance)).collect()
    }

    #[test]
    fn silent_drill_moves_on_after_five_chances() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("progress.jsonl");
        let results = run_drill(&lab_engine(), &mut silence(), &drill_prompts(), &settings(6), &log).unwrap();

        assert_eq!(
            schedule(&results),
            vec![
                ("GROUND", 1),
                ("GROUND", 2),
                ("GROUND", 3),
                ("GROUND", 4),
                ("GROUND", 5),
                ("BOOM", 1),
            ]
        );
        assert!(results.iter().all(|a| !a.mastered));
        assert!(history::load(&log).unwrap().is_empty());
    }

    #[test]
    fn mastered_attempt_is_logged_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("progress.jsonl");
        let results = run_drill(&lab_engine(), &mut full_voice(), &drill_prompts(), &settings(1), &log).unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].mastered);
        let entries = history::load(&log).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prompt.as_deref(), Some("GROUND"));
        assert!(entries[0].scores.all_at_least(85));
    }

    #[test]
    fn success_resets_the_chance_counter() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("progress.jsonl");
        let mut source = Takes {
            takes: vec![silence(), silence(), full_voice(), silence()],
            next: 0,
        };
        let results = run_drill(&lab_engine(), &mut source, &drill_prompts(), &settings(4), &log).unwrap();

        assert_eq!(
            schedule(&results),
            vec![("GROUND", 1), ("GROUND", 2), ("GROUND", 3), ("BOOM", 1)]
        );
        let mastered: Vec<bool> = results.iter().map(|a| a.mastered).collect();
        assert_eq!(mastered, vec![false, false, true, false]);
        assert_eq!(history::load(&log).unwrap().len(), 1);
    }

    #[test]
    fn drill_needs_prompts() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("progress.jsonl");
        assert!(run_drill(&lab_engine(), &mut silence(), &[], &settings(1), &log).is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn parses_simulated_analyze() {
        let args = Args::try_parse_from([
            "resonance", "--preset", "live", "analyze", "--simulate", "--seed", "3",
        ])
        .unwrap();
        assert_eq!(args.preset, "live");
        match args.command {
            Command::Analyze { duration, input } => {
                assert_eq!(duration, None);
                assert!(input.simulate);
                assert_eq!(input.seed, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn wav_and_simulate_conflict() {
        let result = Args::try_parse_from([
            "resonance", "analyze", "--wav", "take.wav", "--simulate",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_preset_is_reported() {
        let args = Args::try_parse_from(["resonance", "--preset", "cloud", "presets"]).unwrap();
        let err = load_config(&args).unwrap_err();
        assert!(err.to_string().contains("lab, live, resonance"));
    }

    #[test]
    fn prompt_selection_falls_back_to_everything() {
        let all = vec!["BOOM".to_owned(), "ALPHA VOICE".to_owned()];
        assert_eq!(select_prompts(all.clone(), PromptKind::Words), vec!["BOOM"]);
        assert_eq!(select_prompts(all.clone(), PromptKind::Sentences), all);
        assert_eq!(select_prompts(all.clone(), PromptKind::All), all);
    }
}
