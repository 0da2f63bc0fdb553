use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::analysis::domain::frame_result::FrameResult;
use crate::analysis::frame_aggregator::FrameAggregator;
use crate::detection::domain::person_detector::PersonDetector;
use crate::media::domain::frame_source::FrameSource;
use crate::media::domain::image_writer::ImageWriter;
use crate::media::infrastructure::box_annotator::BoxAnnotator;
use crate::pipeline::analysis_logger::AnalysisLogger;
use crate::pipeline::result_log::ResultLog;
use crate::shared::source_metadata::SourceMetadata;

/// Called after each analyzed frame with its result and source file name
/// (`None` for video frames).
/// Returning `false` stops the run; frames analyzed so far are kept.
pub type FrameCallback = Box<dyn FnMut(&FrameResult, Option<&str>) -> bool + Send>;

struct AnnotationOutput {
    dir: PathBuf,
    writer: Box<dyn ImageWriter>,
    annotator: BoxAnnotator,
}

/// Runs head-up analysis over an image sequence or a video:
/// read → detect → aggregate → (annotate) → log.
///
/// Frames that fail to decode are skipped with a warning. Detector failures
/// abort the run. The source is closed either way.
pub struct AnalyzeFramesUseCase {
    source: Box<dyn FrameSource>,
    detector: Box<dyn PersonDetector>,
    aggregator: FrameAggregator,
    logger: Box<dyn AnalysisLogger>,
    stride: usize,
    annotations: Option<AnnotationOutput>,
    on_frame: Option<FrameCallback>,
}

impl AnalyzeFramesUseCase {
    pub fn new(
        source: Box<dyn FrameSource>,
        detector: Box<dyn PersonDetector>,
        aggregator: FrameAggregator,
        logger: Box<dyn AnalysisLogger>,
    ) -> Self {
        Self {
            source,
            detector,
            aggregator,
            logger,
            stride: 1,
            annotations: None,
            on_frame: None,
        }
    }

    /// Analyze every `stride`-th frame, starting with the first. Frame
    /// indices are not renumbered.
    pub fn with_stride(mut self, stride: usize) -> Self {
        self.stride = stride.max(1);
        self
    }

    /// Save each analyzed frame, boxes outlined by orientation, into `dir`.
    pub fn with_annotations(mut self, dir: &Path, writer: Box<dyn ImageWriter>) -> Self {
        self.annotations = Some(AnnotationOutput {
            dir: dir.to_path_buf(),
            writer,
            annotator: BoxAnnotator::default(),
        });
        self
    }

    pub fn with_on_frame(mut self, on_frame: FrameCallback) -> Self {
        self.on_frame = Some(on_frame);
        self
    }

    pub fn execute(&mut self, input: &Path) -> Result<ResultLog, Box<dyn std::error::Error>> {
        let metadata = self.source.open(input)?;
        let total = metadata.total_frames.div_ceil(self.stride);
        self.logger.info(&format!(
            "Analyzing {total} of {} frames from {}",
            metadata.total_frames,
            metadata.source_path.as_deref().unwrap_or(input).display()
        ));

        let mut results = ResultLog::new();
        let outcome = self.run(&metadata, total, &mut results);
        self.source.close();
        outcome?;

        self.logger.summary();
        Ok(results)
    }

    fn run(
        &mut self,
        metadata: &SourceMetadata,
        total: usize,
        results: &mut ResultLog,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let mut frames = self.source.frames();
        let mut position = 0usize;

        loop {
            let t_decode = Instant::now();
            let Some(item) = frames.next() else {
                break;
            };
            let sampled = position % self.stride == 0;
            position += 1;
            if !sampled {
                continue;
            }

            let mut frame = match item {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping unreadable frame {position}: {e}");
                    continue;
                }
            };
            self.logger
                .timing("decode", t_decode.elapsed().as_secs_f64() * 1000.0);

            let t_detect = Instant::now();
            let detections = self.detector.detect(&frame)?;
            self.logger
                .timing("detect", t_detect.elapsed().as_secs_f64() * 1000.0);

            let t_analyze = Instant::now();
            let result = self
                .aggregator
                .analyze_frame(&frame, &detections, frame.index());
            self.logger
                .timing("analyze", t_analyze.elapsed().as_secs_f64() * 1000.0);
            self.logger.metric("persons", result.persons as f64);
            self.logger.metric("head_up_rate", result.head_up_rate);

            let name = metadata.frame_name(frame.index());

            if let Some(output) = &self.annotations {
                let t_annotate = Instant::now();
                output.annotator.annotate(&mut frame, &result.individuals);
                let file_name = match &name {
                    Some(n) => format!("{:06}_{n}", frame.index()),
                    None => format!("{:06}.png", frame.index()),
                };
                output.writer.write(&output.dir.join(file_name), &frame)?;
                self.logger
                    .timing("annotate", t_annotate.elapsed().as_secs_f64() * 1000.0);
            }

            let keep_going = match self.on_frame.as_mut() {
                Some(callback) => callback(&result, name.as_deref()),
                None => true,
            };
            results.push(result);
            self.logger.progress(results.len(), total);

            if !keep_going {
                self.logger
                    .info(&format!("Analysis stopped after {} frames", results.len()));
                break;
            }
        }
        Ok(())
    }
}
