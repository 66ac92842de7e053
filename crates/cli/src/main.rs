use std::io::BufReader;
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;

use watchpost_core::detection::infrastructure::model_resolver;
use watchpost_core::detection::infrastructure::onnx_yolo_detector::{OnnxYoloDetector, YoloOptions};
use watchpost_core::notification::domain::notification_sink::{
    NotificationSink, NullNotificationSink,
};
use watchpost_core::notification::infrastructure::telegram_notifier::{
    TelegramConfig, TelegramNotifier,
};
use watchpost_core::pipeline::frame_scheduler::FrameScheduler;
use watchpost_core::pipeline::monitor_session_use_case::MonitorSessionUseCase;
use watchpost_core::presence::presence_tracker::PresenceTracker;
use watchpost_core::session::domain::control_command::ControlCommand;
use watchpost_core::session::infrastructure::control_listener::spawn_control_listener;
use watchpost_core::session::infrastructure::file_event_log::FileEventLog;
use watchpost_core::session::settings::MonitorSettings;
use watchpost_core::shared::constants::{YOLO_MODEL_NAME, YOLO_MODEL_URL};
use watchpost_core::video::domain::video_writer::{VideoWriter, VideoWriterFactory};
use watchpost_core::video::infrastructure::ffmpeg_reader::FfmpegReader;
use watchpost_core::video::infrastructure::ffmpeg_writer::FfmpegWriter;
use watchpost_core::video::infrastructure::image_file_writer::ImageFileWriter;

/// Watches a camera for people and records each arrival.
///
/// While running, type a key and press Enter: `p` pause/resume, `s` manual
/// snapshot, `+`/`-` adjust confidence, `q` quit.
#[derive(Parser)]
#[command(name = "watchpost")]
struct Cli {
    /// Settings file (defaults to the platform config directory).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective settings to the settings file and exit.
    #[arg(long)]
    save_config: bool,

    /// Camera device, video file or stream URL.
    #[arg(long)]
    source: Option<String>,

    /// FFmpeg input device format (v4l2, avfoundation, dshow).
    #[arg(long)]
    input_format: Option<String>,

    /// Requested capture width.
    #[arg(long)]
    width: Option<u32>,

    /// Requested capture height.
    #[arg(long)]
    height: Option<u32>,

    /// Requested capture frame rate.
    #[arg(long)]
    fps: Option<u32>,

    /// Local ONNX model file (skips the download).
    #[arg(long)]
    model: Option<PathBuf>,

    /// Person detection confidence threshold (0.0-1.0).
    #[arg(long)]
    confidence: Option<f64>,

    /// Run detection every Nth frame (1 = every frame).
    #[arg(long)]
    frame_skip: Option<usize>,

    /// Minimum seconds between two arrival events.
    #[arg(long)]
    cooldown: Option<f64>,

    /// Seconds without a detection before the person counts as gone.
    #[arg(long)]
    grace: Option<f64>,

    /// Do not save a snapshot per event.
    #[arg(long)]
    no_snapshots: bool,

    /// Do not record a clip per event.
    #[arg(long)]
    no_clips: bool,

    /// Clip length in seconds.
    #[arg(long)]
    clip_duration: Option<f64>,

    /// Clip frame rate (whole number, at least 1).
    #[arg(long)]
    clip_fps: Option<f64>,

    /// Base directory for snapshots and clips.
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Event log file.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

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
        None => MonitorSettings::default_path()?,
    };
    let mut settings = MonitorSettings::load(&config_path)?;
    apply_overrides(&cli, &mut settings);

    if cli.save_config {
        settings.save(&config_path)?;
        log::info!("Settings written to {}", config_path.display());
        return Ok(());
    }
    settings.apply_env();

    let presence_config = settings.presence_config();
    presence_config.validate()?;

    let detector = build_detector(&settings)?;
    let scheduler = FrameScheduler::new(Box::new(detector), settings.detection.frame_skip)?;

    let log_path = settings.outputs.log_path();
    let event_log = FileEventLog::open(&log_path)
        .map_err(|e| format!("Cannot open event log {}: {e}", log_path.display()))?;
    log::info!("Event log: {}", log_path.display());

    let writer_factory: VideoWriterFactory =
        Box::new(|| Box::new(FfmpegWriter::new()) as Box<dyn VideoWriter>);
    let tracker = PresenceTracker::new(
        presence_config,
        writer_factory,
        Box::new(ImageFileWriter::new()),
        build_notifier(&settings)?,
        Box::new(event_log),
        Utc::now(),
    )?;

    let (command_tx, command_rx) = crossbeam_channel::unbounded();
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        let command_tx = command_tx.clone();
        ctrlc::set_handler(move || {
            cancelled.store(true, Ordering::SeqCst);
            let _ = command_tx.try_send(ControlCommand::Quit);
        })?;
    }
    spawn_control_listener(BufReader::new(std::io::stdin()), command_tx);
    log::info!("Controls: p pause/resume, s snapshot, +/- confidence, q quit (press Enter)");

    let source = settings.capture_source();
    let mut use_case = MonitorSessionUseCase::new(
        Box::new(FfmpegReader::new()),
        scheduler,
        tracker,
        Some(command_rx),
        Some(cancelled),
    );
    let summary = use_case.run(&source)?;

    log::info!(
        "Session finished: {} frames read, {} processed, {} detector runs, {} events, {} clips",
        summary.frames_read,
        summary.frames_processed,
        summary.detector_runs,
        summary.events_fired,
        summary.clips_saved
    );
    Ok(())
}

fn apply_overrides(cli: &Cli, settings: &mut MonitorSettings) {
    if let Some(source) = &cli.source {
        settings.camera.source = source.clone();
    }
    if let Some(format) = &cli.input_format {
        settings.camera.input_format = Some(format.clone()).filter(|f| !f.is_empty());
    }
    if let Some(width) = cli.width {
        settings.camera.width = width;
    }
    if let Some(height) = cli.height {
        settings.camera.height = height;
    }
    if let Some(fps) = cli.fps {
        settings.camera.fps = fps;
    }
    if let Some(model) = &cli.model {
        settings.detection.model_path = Some(model.clone());
    }
    if let Some(confidence) = cli.confidence {
        settings.detection.confidence = confidence;
    }
    if let Some(skip) = cli.frame_skip {
        settings.detection.frame_skip = skip;
    }
    if let Some(cooldown) = cli.cooldown {
        settings.events.event_cooldown_seconds = cooldown;
    }
    if let Some(grace) = cli.grace {
        settings.events.absence_grace_seconds = grace;
    }
    if cli.no_snapshots {
        settings.outputs.save_snapshots = false;
    }
    if cli.no_clips {
        settings.outputs.save_clips = false;
    }
    if let Some(duration) = cli.clip_duration {
        settings.outputs.clip_duration_seconds = duration;
    }
    if let Some(fps) = cli.clip_fps {
        settings.outputs.clip_fps = fps;
    }
    if let Some(dir) = &cli.output_dir {
        settings.outputs.base_dir = dir.clone();
        settings.outputs.snapshots_dir = None;
        settings.outputs.clips_dir = None;
    }
    if let Some(log_file) = &cli.log_file {
        if let Some(parent) = log_file.parent() {
            settings.outputs.logs_dir = parent.to_path_buf();
        }
        if let Some(name) = log_file.file_name() {
            settings.outputs.log_file_name = name.to_string_lossy().into_owned();
        }
    }
}

fn build_detector(settings: &MonitorSettings) -> Result<OnnxYoloDetector, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {YOLO_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        settings.detection.model_path.as_deref(),
        YOLO_MODEL_NAME,
        YOLO_MODEL_URL,
        Some(Box::new(download_progress)),
    )?;
    eprintln!();

    let options = YoloOptions {
        confidence: settings.detection.confidence,
        iou_threshold: settings.detection.iou_threshold,
        class_id: settings.detection.person_class_id,
    };
    OnnxYoloDetector::new(&model_path, options)
}

fn build_notifier(
    settings: &MonitorSettings,
) -> Result<Box<dyn NotificationSink>, Box<dyn std::error::Error>> {
    let Some((token, chat_id)) = settings.notifications.telegram_credentials() else {
        log::warn!("Telegram is not configured, alerts will only be logged locally");
        return Ok(Box::new(NullNotificationSink));
    };
    let config = TelegramConfig::new(token, chat_id)
        .with_timeout(Duration::from_secs(settings.notifications.timeout_seconds));
    Ok(Box::new(TelegramNotifier::new(config)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(confidence) = cli.confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!("Confidence must be between 0.0 and 1.0, got {confidence}").into());
        }
    }
    if cli.frame_skip == Some(0) {
        return Err("Frame skip must be at least 1".into());
    }
    if let Some(model) = &cli.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading person detection model... {pct}%");
    } else {
        eprint!("\rDownloading person detection model... {downloaded} bytes");
    }
}
