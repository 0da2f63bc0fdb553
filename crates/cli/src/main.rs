use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, ValueEnum};

use classwatch_core::analysis::domain::frame_result::FrameResult;
use classwatch_core::analysis::frame_aggregator::FrameAggregator;
use classwatch_core::detection::domain::person_detector::PersonDetector;
use classwatch_core::detection::infrastructure::onnx_blazeface_detector::{
    BlazefaceSettings, OnnxBlazefaceDetector,
};
use classwatch_core::detection::infrastructure::onnx_yolo_detector::{
    OnnxYoloPersonDetector, YoloSettings, DEFAULT_CONFIDENCE, DEFAULT_IOU, DEFAULT_MAX_DET,
};
use classwatch_core::detection::infrastructure::precomputed_detections::PrecomputedDetections;
use classwatch_core::export::document_writer::DocumentScope;
use classwatch_core::identity::domain::face_identifier::FaceIdentifier;
use classwatch_core::identity::infrastructure::histogram_gallery_identifier::HistogramGalleryIdentifier;
use classwatch_core::media::domain::frame_source::FrameSource;
use classwatch_core::media::infrastructure::ffmpeg_video_reader::{is_video_path, FfmpegVideoReader};
use classwatch_core::media::infrastructure::image_directory_reader::ImageDirectoryReader;
use classwatch_core::media::infrastructure::image_file_writer::ImageFileWriter;
use classwatch_core::pipeline::analysis_logger::StdoutAnalysisLogger;
use classwatch_core::pipeline::analyze_frames_use_case::AnalyzeFramesUseCase;
use classwatch_core::shared::config::AnalysisConfig;

/// Head-up rate analysis over classroom images or video.
#[derive(Parser)]
#[command(name = "classwatch")]
struct Cli {
    /// Video file, image directory (searched recursively) or a single image.
    input: PathBuf,

    /// YOLOv8 ONNX person detection model.
    #[arg(long)]
    model: Option<PathBuf>,

    /// Precomputed detections JSON (frame index → detections), instead of a model.
    #[arg(long)]
    detections: Option<PathBuf>,

    /// Analysis config JSON. Defaults to the platform config file if present.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Samples per smoothing window.
    #[arg(long)]
    window_size: Option<usize>,

    /// Fraction of the person box height treated as the head (0.0-1.0].
    #[arg(long)]
    head_region_ratio: Option<f64>,

    /// Head brightness at or above which a head counts as up (0.0-1.0).
    #[arg(long)]
    brightness_threshold: Option<f64>,

    /// Disable face identification; every person gets an anonymous id.
    #[arg(long)]
    no_face: bool,

    /// Face gallery: one subdirectory of reference face images per person.
    #[arg(long)]
    gallery: Option<PathBuf>,

    /// BlazeFace ONNX model used to find faces inside person boxes.
    #[arg(long)]
    face_model: Option<PathBuf>,

    /// Match distance above which a face is reported as Unknown.
    #[arg(long)]
    unknown_threshold: Option<f64>,

    /// Forget identities not seen for this many analyzed frames.
    #[arg(long)]
    max_idle_frames: Option<usize>,

    /// Detection confidence threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    confidence: f64,

    /// NMS IoU threshold (0.0-1.0).
    #[arg(long, default_value_t = DEFAULT_IOU)]
    iou: f64,

    /// Maximum detections per image.
    #[arg(long, default_value_t = DEFAULT_MAX_DET)]
    max_det: usize,

    /// Keep every detector class instead of persons only.
    #[arg(long)]
    all_classes: bool,

    /// Analyze every Nth image (1 = every image).
    #[arg(long, default_value = "1")]
    stride: usize,

    /// Global per-frame CSV.
    #[arg(long)]
    output_csv: Option<PathBuf>,

    /// Per-identity CSV.
    #[arg(long)]
    per_person_csv: Option<PathBuf>,

    /// Result log as JSON.
    #[arg(long)]
    output_json: Option<PathBuf>,

    /// JSON content.
    #[arg(long, value_enum, default_value_t = JsonScope::Full)]
    json_scope: JsonScope,

    /// Save annotated images (green up, red down, grey unknown) here.
    #[arg(long)]
    save_anno_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum JsonScope {
    /// Every analyzed frame.
    Full,
    /// Only the last analyzed frame.
    Latest,
}

impl From<JsonScope> for DocumentScope {
    fn from(scope: JsonScope) -> Self {
        match scope {
            JsonScope::Full => DocumentScope::FullLog,
            JsonScope::Latest => DocumentScope::LatestRecord,
        }
    }
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

    let config = build_config(&cli)?;
    let identifier = build_identifier(&cli, &config)?;
    let aggregator = FrameAggregator::new(config, identifier)?;
    let detector = build_detector(&cli)?;

    let mut use_case = AnalyzeFramesUseCase::new(
        build_source(&cli.input),
        detector,
        aggregator,
        Box::new(StdoutAnalysisLogger::default()),
    )
    .with_stride(cli.stride)
    .with_on_frame(Box::new(|result: &FrameResult, name: Option<&str>| {
        let label = match name {
            Some(name) => name.to_string(),
            None => format!("frame {}", result.frame),
        };
        println!(
            "Processed {label}: {} identities, overall={:.2}",
            result.individuals.len(),
            result.head_up_rate
        );
        true
    }));
    if let Some(dir) = &cli.save_anno_dir {
        use_case = use_case.with_annotations(dir, Box::new(ImageFileWriter::new()));
    }

    let results = use_case.execute(&cli.input)?;
    if results.is_empty() {
        return Err(format!("No frames analyzed from {}", cli.input.display()).into());
    }

    if let Some(path) = &cli.output_csv {
        results.export_global_csv(path)?;
        println!("Saved global CSV to: {}", path.display());
    }
    if let Some(path) = &cli.per_person_csv {
        results.export_individual_csv(path)?;
        println!("Saved per-identity CSV to: {}", path.display());
    }
    if let Some(path) = &cli.output_json {
        results.export_json(path, cli.json_scope.into())?;
        println!("Saved JSON to: {}", path.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<AnalysisConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::load_or_default(AnalysisConfig::default_path().as_deref())?,
    };

    if let Some(v) = cli.window_size {
        config.window_size = v;
    }
    if let Some(v) = cli.head_region_ratio {
        config.head_region_ratio = v;
    }
    if let Some(v) = cli.brightness_threshold {
        config.brightness_threshold = v;
    }
    if let Some(v) = cli.unknown_threshold {
        config.unknown_threshold = v;
    }
    if cli.max_idle_frames.is_some() {
        config.max_idle_frames = cli.max_idle_frames;
    }
    if cli.no_face {
        config.enable_face_identification = false;
    }

    config.validate()?;
    log::debug!("Analysis config: {config:?}");
    Ok(config)
}

fn build_identifier(
    cli: &Cli,
    config: &AnalysisConfig,
) -> Result<Option<Box<dyn FaceIdentifier>>, Box<dyn std::error::Error>> {
    if !config.enable_face_identification {
        return Ok(None);
    }
    let gallery = cli
        .gallery
        .as_ref()
        .ok_or("Face identification needs --gallery DIR (or pass --no-face)")?;
    let face_model = cli
        .face_model
        .as_ref()
        .ok_or("Face identification needs --face-model PATH (or pass --no-face)")?;
    require_file("--face-model", face_model)?;

    let face_detector = OnnxBlazefaceDetector::new(face_model, BlazefaceSettings::default())?;
    let identifier = HistogramGalleryIdentifier::from_dir(
        gallery,
        config.unknown_threshold,
        Box::new(face_detector),
    )?;
    Ok(Some(Box::new(identifier)))
}

fn build_source(input: &Path) -> Box<dyn FrameSource> {
    if input.is_file() && is_video_path(input) {
        Box::new(FfmpegVideoReader::new())
    } else {
        Box::new(ImageDirectoryReader::new())
    }
}

fn build_detector(cli: &Cli) -> Result<Box<dyn PersonDetector>, Box<dyn std::error::Error>> {
    if let Some(path) = &cli.detections {
        return Ok(Box::new(PrecomputedDetections::from_path(path)?));
    }
    let model = cli
        .model
        .as_ref()
        .ok_or("Either --model or --detections is required")?;
    let settings = YoloSettings {
        confidence: cli.confidence,
        iou: cli.iou,
        max_det: cli.max_det,
        classes: if cli.all_classes {
            None
        } else {
            YoloSettings::default().classes
        },
    };
    Ok(Box::new(OnnxYoloPersonDetector::new(model, settings)?))
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input not found: {}", cli.input.display()).into());
    }
    match (&cli.model, &cli.detections) {
        (Some(_), Some(_)) => return Err("--model and --detections are mutually exclusive".into()),
        (None, None) => return Err("Either --model or --detections is required".into()),
        _ => {}
    }
    for (flag, path) in [("--model", &cli.model), ("--detections", &cli.detections)] {
        if let Some(p) = path {
            require_file(flag, p)?;
        }
    }
    if !(0.0..=1.0).contains(&cli.confidence) {
        return Err(format!(
            "Confidence must be between 0.0 and 1.0, got {}",
            cli.confidence
        )
        .into());
    }
    if !(0.0..=1.0).contains(&cli.iou) {
        return Err(format!("IoU must be between 0.0 and 1.0, got {}", cli.iou).into());
    }
    if cli.max_det == 0 {
        return Err("Max detections must be at least 1".into());
    }
    if cli.stride == 0 {
        return Err("Stride must be at least 1".into());
    }
    if cli.no_face && (cli.gallery.is_some() || cli.face_model.is_some()) {
        log::warn!("--gallery and --face-model are ignored with --no-face");
    }
    Ok(())
}

fn require_file(flag: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.is_file() {
        Ok(())
    } else {
        Err(format!("{flag} file not found: {}", path.display()).into())
    }
}
