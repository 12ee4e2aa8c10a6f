use std::io::BufRead;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use crossbeam_channel::{unbounded, Sender};

use photobooth_core::booth::coordinator::Booth;
use photobooth_core::booth::event_loop::{self, BoothEvent, Command, LoopTiming};
use photobooth_core::calibration::calibration_controller::{
    CalibrationController, CalibrationStep,
};
use photobooth_core::capture::capture_session::{CaptureSession, TickOutcome};
use photobooth_core::capture::output_namer::TimestampNamer;
use photobooth_core::compositing::infrastructure::strip_compositor::StripCompositor;
use photobooth_core::config::domain::booth_config::{default_entries, BoothConfig};
use photobooth_core::config::domain::config_store::ConfigStore;
use photobooth_core::config::infrastructure::file_config_store::FileConfigStore;
use photobooth_core::detection::domain::tunable_detector::TunableDetector;
use photobooth_core::detection::infrastructure::model_resolver::{self, ModelResolveError};
use photobooth_core::detection::infrastructure::onnx_blazeface_detector::BlazefaceDetectorFactory;
use photobooth_core::shared::constants::{
    BLAZEFACE_MODEL_NAME, DEFAULT_COUNTDOWN_TICKS, DEFAULT_FPS,
};
use photobooth_core::video::domain::frame_source::FrameSource;
use photobooth_core::video::infrastructure::ffmpeg_frame_source::{FfmpegFrameSource, FrameInput};
use photobooth_core::video::infrastructure::image_sequence_source::ImageSequenceSource;

/// Self-calibrating photo booth.
#[derive(Parser)]
#[command(name = "photobooth")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Camera URL or video file to read instead of the configured camera.
    #[arg(long, global = true)]
    input: Option<String>,

    /// ffmpeg input format for --input (e.g. v4l2, avfoundation, rtsp).
    #[arg(long, global = true, requires = "input")]
    input_format: Option<String>,

    /// Play a directory of images instead of a camera.
    #[arg(long, global = true, conflicts_with = "input")]
    frames_dir: Option<PathBuf>,

    /// Live frame rate. Defaults to the source's own rate.
    #[arg(long, global = true)]
    fps: Option<f64>,

    /// Directory holding blazeface_short_range.onnx, checked after the model cache.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Where to download the face detection model from when it is not found locally.
    #[arg(long, global = true)]
    model_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tune the face detector for a known number of people in view.
    Calibrate {
        /// How many faces are in front of the camera.
        #[arg(long)]
        faces: usize,
    },
    /// Run the booth: Enter starts a session, q quits.
    Capture {
        /// Shots per session (defaults to the images_session setting).
        #[arg(long)]
        shots: Option<usize>,

        /// Seconds counted down before each shot.
        #[arg(long, default_value_t = DEFAULT_COUNTDOWN_TICKS)]
        countdown: u32,

        /// Where sheets are saved (defaults to the main_folder setting).
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Inspect or change persisted settings.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print every setting.
    Show,
    /// Update one setting and save it.
    Set { key: String, value: String },
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => FileConfigStore::default_path().ok_or("Could not determine config directory")?,
    };
    let mut store = FileConfigStore::load(&config_path)?;

    match &cli.command {
        Commands::Config { action } => run_config(action, &mut store),
        Commands::Calibrate { faces } => run_calibration(&cli, store, *faces),
        Commands::Capture {
            shots,
            countdown,
            output_dir,
        } => run_capture(&cli, store, *shots, *countdown, output_dir.as_deref()),
    }
}

fn run_config(
    action: &ConfigAction,
    store: &mut FileConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            println!("# {}", store.path().display());
            for (key, value) in store.entries() {
                println!("{key} = {value}");
            }
        }
        ConfigAction::Set { key, value } => {
            if !default_entries().iter().any(|(k, _)| *k == key.as_str()) {
                return Err(format!("Unknown setting '{key}'").into());
            }
            store.set(key, value);
            BoothConfig::from_store(&*store)?;
            store.persist()?;
            println!("{key} = {value}");
        }
    }
    Ok(())
}

fn run_calibration(
    cli: &Cli,
    store: FileConfigStore,
    faces: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = BoothConfig::from_store(&store)?;
    let (booth, fps) = build_booth(cli, store, &settings, None, DEFAULT_COUNTDOWN_TICKS, None)?;

    let (tx, rx) = unbounded();
    tx.send(Command::Calibrate(faces))?;

    let mut failure: Option<String> = None;
    event_loop::run(booth, &rx, LoopTiming::for_fps(fps)?, |event| match event {
        BoothEvent::CalibrationStarted { expected_faces } => {
            eprintln!("Calibrating for {expected_faces} face(s), hold still...");
            ControlFlow::Continue(())
        }
        BoothEvent::Calibration(CalibrationStep::Completed { parameter }) => {
            eprintln!();
            println!("face_detection_coeff = {parameter}");
            ControlFlow::Break(())
        }
        BoothEvent::Calibration(CalibrationStep::Adjusted {
            comparisons_made,
            parameter,
            ..
        }) => {
            eprint!("\rFrame {comparisons_made}: parameter {parameter}   ");
            ControlFlow::Continue(())
        }
        BoothEvent::Error(e) => {
            failure = Some(e.to_string());
            ControlFlow::Break(())
        }
        _ => ControlFlow::Continue(()),
    });
    drop(tx);

    match failure {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

fn run_capture(
    cli: &Cli,
    store: FileConfigStore,
    shots: Option<usize>,
    countdown: u32,
    output_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let settings = BoothConfig::from_store(&store)?;
    let (booth, fps) = build_booth(cli, store, &settings, shots, countdown, output_dir)?;

    let (tx, rx) = unbounded();
    spawn_keyboard_reader(tx);
    eprintln!("Press Enter to start a session, q to quit.");

    event_loop::run(booth, &rx, LoopTiming::for_fps(fps)?, |event| {
        match event {
            BoothEvent::CaptureStarted { status } => eprintln!("{status}"),
            BoothEvent::Capture(TickOutcome::Countdown { remaining }) => eprint!("\r{remaining}... "),
            BoothEvent::Capture(TickOutcome::ShotTaken {
                shots_taken,
                face_count,
                status,
            }) => eprintln!("\rShot {shots_taken}: {face_count} face(s). {status}"),
            BoothEvent::Capture(TickOutcome::Completed { output, status }) => {
                println!("\r{}", output.display());
                eprintln!("{status}");
            }
            BoothEvent::Error(e) => eprintln!("\rError: {e}"),
            _ => {}
        }
        ControlFlow::Continue(())
    });
    Ok(())
}

/// Wires the frame source, detector, controllers and compositor into a
/// booth. Returns it with the frame rate the live tick should run at.
fn build_booth(
    cli: &Cli,
    store: FileConfigStore,
    settings: &BoothConfig,
    shots: Option<usize>,
    countdown: u32,
    output_dir: Option<&Path>,
) -> Result<(Booth, f64), Box<dyn std::error::Error>> {
    let mut source = build_source(cli, settings);
    source.open()?;
    let fps = cli.fps.or(source.nominal_fps()).unwrap_or(DEFAULT_FPS);
    log::info!("Live tick at {fps:.1} fps");

    let detector = build_detector(cli, settings)?;
    let calibration = CalibrationController::for_frame_rate(fps)?;

    let compositor = StripCompositor::new(settings.stamp_path.clone(), settings.filter_path.clone())
        .with_open_on_save(settings.open_on_save);
    let output_dir = output_dir.unwrap_or(settings.main_folder.as_path());
    let capture = CaptureSession::new(
        shots.unwrap_or(settings.images_per_session),
        countdown,
        Box::new(compositor),
        Box::new(TimestampNamer::new(output_dir)),
    )?;

    let booth = Booth::new(source, detector, Box::new(store), calibration, capture);
    Ok((booth, fps))
}

fn build_source(cli: &Cli, settings: &BoothConfig) -> Box<dyn FrameSource> {
    if let Some(dir) = &cli.frames_dir {
        return Box::new(ImageSequenceSource::new(dir, cli.fps.unwrap_or(DEFAULT_FPS)));
    }
    match &cli.input {
        Some(url) => Box::new(
            FfmpegFrameSource::new(FrameInput::Url {
                url: url.clone(),
                format: cli.input_format.clone(),
            })
            .with_looping(Path::new(url).is_file()),
        ),
        None => Box::new(FfmpegFrameSource::new(FrameInput::Camera(
            settings.camera_index,
        ))),
    }
}

fn build_detector(
    cli: &Cli,
    settings: &BoothConfig,
) -> Result<TunableDetector, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {BLAZEFACE_MODEL_NAME}");
    let model_path = resolve_model(cli, &model_resolver::model_cache_dir()?)?;

    let factory = BlazefaceDetectorFactory::new(&model_path)?;
    Ok(TunableDetector::new(
        Box::new(factory),
        settings.face_detection_coeff,
    )?)
}

fn resolve_model(cli: &Cli, cache_dir: &Path) -> Result<PathBuf, ModelResolveError> {
    model_resolver::resolve_in(
        cache_dir,
        BLAZEFACE_MODEL_NAME,
        cli.model_url.as_deref(),
        cli.model_dir.as_deref(),
        Some(Box::new(download_progress)),
    )
}

/// Enter triggers a session, `q` (or end of input) quits.
fn spawn_keyboard_reader(tx: Sender<Command>) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            let command = if line.trim().eq_ignore_ascii_case("q") {
                Command::Quit
            } else {
                Command::Trigger
            };
            if tx.send(command).is_err() || command == Command::Quit {
                return;
            }
        }
        let _ = tx.send(Command::Quit);
    });
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(fps) = cli.fps {
        if !fps.is_finite() || fps <= 0.0 {
            return Err(format!("FPS must be positive, got {fps}").into());
        }
    }
    if let Some(dir) = &cli.frames_dir {
        if !dir.is_dir() {
            return Err(format!("Frames directory not found: {}", dir.display()).into());
        }
    }
    if let Some(dir) = &cli.model_dir {
        if !dir.is_dir() {
            return Err(format!("Model directory not found: {}", dir.display()).into());
        }
    }
    match &cli.command {
        Commands::Calibrate { faces } if *faces == 0 => {
            Err("Face count must be at least 1".into())
        }
        Commands::Capture { shots: Some(0), .. } => {
            Err("Shots per session must be at least 1".into())
        }
        Commands::Capture { countdown: 0, .. } => Err("Countdown must be at least 1".into()),
        _ => Ok(()),
    }
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face detection model... {pct}%");
    } else {
        eprint!("\rDownloading face detection model... {downloaded} bytes");
    }
}
