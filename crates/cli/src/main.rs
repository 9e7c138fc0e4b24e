use std::fs::File;
use std::io::{self, BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use facemood_core::annotation::infrastructure::box_label_annotator::BoxLabelAnnotator;
use facemood_core::classification::domain::emotion_classifier::EmotionClassifier;
use facemood_core::classification::infrastructure::label_manifest::{LabelManifest, OutputKind};
use facemood_core::classification::infrastructure::onnx_emotion_classifier::{
    ExecutionTarget, OnnxEmotionClassifier,
};
use facemood_core::detection::infrastructure::cascade_face_localizer::CascadeFaceLocalizer;
use facemood_core::pipeline::infrastructure::threaded_frame_sink::ThreadedFrameSink;
use facemood_core::pipeline::pipeline_logger::{
    NullPipelineLogger, PipelineLogger, SummaryPipelineLogger,
};
use facemood_core::pipeline::recognize_emotions_use_case::RecognizeEmotionsUseCase;
use facemood_core::pipeline::snapshot_use_case::SnapshotUseCase;
use facemood_core::pipeline::stream_emotions_use_case::StreamEmotionsUseCase;
use facemood_core::shared::constants::{DEFAULT_JPEG_QUALITY, MJPEG_CONTENT_TYPE};
use facemood_core::video::domain::frame_sink::FrameSink;
use facemood_core::video::domain::frame_source::{FrameSource, SourceSpec};
use facemood_core::video::infrastructure::ffmpeg_frame_source::FfmpegFrameSource;
use facemood_core::video::infrastructure::image_file_source::{is_image_path, ImageFileSource};
use facemood_core::video::infrastructure::jpeg_encoder::encode_jpeg;
use facemood_core::video::infrastructure::mjpeg_stream_writer::MjpegStreamWriter;

/// Real-time facial emotion recognition for cameras, videos and images.
#[derive(Parser)]
#[command(name = "facemood")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream annotated frames as multipart MJPEG.
    Stream(StreamArgs),
    /// Process one frame and print its detections as JSON.
    Snapshot(SnapshotArgs),
    /// Write the label manifest expected next to a model.
    Manifest(ManifestArgs),
}

#[derive(Args)]
struct PipelineArgs {
    /// Camera index (e.g. 0) or path to a video or image file.
    #[arg(long, default_value = "0")]
    source: String,

    /// ONNX emotion classifier.
    #[arg(long)]
    model: PathBuf,

    /// Label manifest (defaults to <model>.labels.json).
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Haar cascade XML for frontal faces.
    #[arg(long)]
    cascade: PathBuf,

    /// Run the classifier on the CPU even when CoreML or DirectML is available.
    #[arg(long)]
    cpu: bool,
}

#[derive(Args)]
struct StreamArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Output file for the MJPEG body (stdout if omitted).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// JPEG quality (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY)]
    quality: u8,

    /// Encode and write frames on a separate thread.
    #[arg(long)]
    threaded_writer: bool,

    /// Stop when a line "q" is read from stdin or stdin closes.
    #[arg(long)]
    quit_on_stdin: bool,
}

#[derive(Args)]
struct SnapshotArgs {
    #[command(flatten)]
    pipeline: PipelineArgs,

    /// Also save the annotated frame as JPEG.
    #[arg(long)]
    save: Option<PathBuf>,
}

#[derive(Args)]
struct ManifestArgs {
    /// Model the manifest belongs to.
    #[arg(long)]
    model: PathBuf,

    /// What the model's last layer emits: softmax or logits.
    #[arg(long, default_value = "softmax")]
    output_kind: String,

    /// Manifest path (defaults to <model>.labels.json).
    #[arg(long)]
    output: Option<PathBuf>,
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

    match cli.command {
        Command::Stream(args) => run_stream(args),
        Command::Snapshot(args) => run_snapshot(args),
        Command::Manifest(args) => run_manifest(args),
    }
}

fn run_stream(args: StreamArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(&args.pipeline, Box::new(SummaryPipelineLogger::default()))?;

    let out: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(io::stdout()),
    };
    let mjpeg = MjpegStreamWriter::with_quality(out, args.quality);
    let sink: Box<dyn FrameSink> = if args.threaded_writer {
        Box::new(ThreadedFrameSink::new(Box::new(mjpeg)))
    } else {
        Box::new(mjpeg)
    };

    let cancelled = Arc::new(AtomicBool::new(false));
    if args.quit_on_stdin {
        spawn_stdin_watcher(cancelled.clone());
    }

    log::info!("Streaming {MJPEG_CONTENT_TYPE}");
    let mut use_case = StreamEmotionsUseCase::new(pipeline, sink, Some(cancelled), args.max_frames);
    let summary = use_case.execute()?;
    log::info!(
        "Processed {} frames, {} faces",
        summary.frames,
        summary.faces
    );
    Ok(())
}

fn run_snapshot(args: SnapshotArgs) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = build_pipeline(&args.pipeline, Box::new(NullPipelineLogger))?;
    let snapshot = SnapshotUseCase::new(pipeline).execute()?;

    println!("{}", snapshot.report.to_json()?);

    if let (Some(path), Some(result)) = (&args.save, &snapshot.result) {
        std::fs::write(path, encode_jpeg(&result.annotated, DEFAULT_JPEG_QUALITY)?)?;
        log::info!("Annotated frame written to {}", path.display());
    }
    Ok(())
}

fn run_manifest(args: ManifestArgs) -> Result<(), Box<dyn std::error::Error>> {
    let manifest = LabelManifest::canonical(parse_output_kind(&args.output_kind));
    let path = args
        .output
        .unwrap_or_else(|| LabelManifest::path_for_model(&args.model));
    manifest.write(&path)?;
    log::info!("Label manifest written to {}", path.display());
    Ok(())
}

/// Loads every startup resource; any failure stops the process before a
/// frame is read.
fn build_pipeline(
    args: &PipelineArgs,
    logger: Box<dyn PipelineLogger>,
) -> Result<RecognizeEmotionsUseCase, Box<dyn std::error::Error>> {
    let manifest_path = args
        .labels
        .clone()
        .unwrap_or_else(|| LabelManifest::path_for_model(&args.model));

    log::info!("Loading classifier: {}", args.model.display());
    let target = if args.cpu {
        ExecutionTarget::Cpu
    } else {
        ExecutionTarget::Platform
    };
    let classifier: Arc<dyn EmotionClassifier> = Arc::new(OnnxEmotionClassifier::load_on(
        &args.model,
        &manifest_path,
        target,
    )?);

    log::info!("Loading cascade: {}", args.cascade.display());
    let localizer = CascadeFaceLocalizer::from_file(&args.cascade)?;

    let source = open_source(&args.source)?;

    Ok(RecognizeEmotionsUseCase::new(
        source,
        Box::new(localizer),
        classifier,
        Box::new(BoxLabelAnnotator::new()),
        logger,
    ))
}

fn open_source(value: &str) -> Result<Box<dyn FrameSource>, Box<dyn std::error::Error>> {
    let path = Path::new(value);
    if is_image_path(path) {
        return Ok(Box::new(ImageFileSource::open(path)?));
    }
    let spec = SourceSpec::parse(value);
    log::info!("Opening {spec}");
    Ok(Box::new(FfmpegFrameSource::open(&spec)?))
}

fn spawn_stdin_watcher(cancelled: Arc<AtomicBool>) {
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) if line.trim() == "q" => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        log::info!("Stop requested");
        cancelled.store(true, Ordering::Relaxed);
    });
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match &cli.command {
        Command::Stream(args) => {
            validate_pipeline(&args.pipeline)?;
            if !(1..=100).contains(&args.quality) {
                return Err(format!("Quality must be between 1 and 100, got {}", args.quality).into());
            }
            if args.max_frames == Some(0) {
                return Err("--max-frames must be at least 1".into());
            }
        }
        Command::Snapshot(args) => validate_pipeline(&args.pipeline)?,
        Command::Manifest(args) => {
            if !matches!(args.output_kind.as_str(), "softmax" | "logits") {
                return Err(format!(
                    "Output kind must be 'softmax' or 'logits', got '{}'",
                    args.output_kind
                )
                .into());
            }
        }
    }
    Ok(())
}

fn validate_pipeline(args: &PipelineArgs) -> Result<(), Box<dyn std::error::Error>> {
    if !args.model.exists() {
        return Err(format!("Model file not found: {}", args.model.display()).into());
    }
    if !args.cascade.exists() {
        return Err(format!("Cascade file not found: {}", args.cascade.display()).into());
    }
    if let SourceSpec::File(path) = SourceSpec::parse(&args.source) {
        if !path.exists() {
            return Err(format!("Source file not found: {}", path.display()).into());
        }
    }
    Ok(())
}

fn parse_output_kind(kind: &str) -> OutputKind {
    if kind == "logits" {
        OutputKind::Logits
    } else {
        OutputKind::Softmax
    }
}
