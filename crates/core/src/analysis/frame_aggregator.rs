use thiserror::Error;

use crate::analysis::domain::analysis_state::AnalysisState;
use crate::analysis::domain::frame_result::{FrameResult, IndividualRecord};
use crate::analysis::domain::orientation::OrientationLabel;
use crate::analysis::domain::region_classifier::RegionClassifier;
use crate::detection::domain::detection::{filter_persons, Detection};
use crate::identity::domain::face_identifier::FaceIdentifier;
use crate::identity::domain::identity_resolver::IdentityResolver;
use crate::shared::config::{AnalysisConfig, ConfigError};
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("face identification is enabled but no face identifier was supplied")]
    MissingIdentifier,
}

/// Per-frame head-up analysis for one session.
///
/// For each person detection, in detector order: classify the head, resolve
/// the identity, update that identity's window. Then update the global
/// window with the frame's head-up rate.
///
/// Not safe for concurrent calls; separate instances share nothing.
/// Smoothing follows call order, not frame indices, so frames must be fed
/// chronologically.
pub struct FrameAggregator {
    config: AnalysisConfig,
    classifier: RegionClassifier,
    resolver: IdentityResolver,
    state: AnalysisState,
}

impl FrameAggregator {
    /// Builds an aggregator for a fresh session.
    ///
    /// `identifier` is required when `config.enable_face_identification` is
    /// set and ignored otherwise.
    pub fn new(
        config: AnalysisConfig,
        identifier: Option<Box<dyn FaceIdentifier>>,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;

        let resolver = match (config.enable_face_identification, identifier) {
            (true, Some(identifier)) => IdentityResolver::new(identifier),
            (true, None) => return Err(AnalysisError::MissingIdentifier),
            (false, Some(_)) => {
                log::debug!("Face identification disabled; ignoring supplied identifier");
                IdentityResolver::disabled()
            }
            (false, None) => IdentityResolver::disabled(),
        };

        Ok(Self {
            classifier: RegionClassifier::new(
                config.head_region_ratio,
                config.brightness_threshold,
            ),
            state: AnalysisState::new(config.window_size, config.max_idle_frames),
            resolver,
            config,
        })
    }

    pub fn analyze_frame(
        &mut self,
        frame: &Frame,
        detections: &[Detection],
        frame_index: usize,
    ) -> FrameResult {
        let persons = filter_persons(detections, self.config.person_class_id);
        let mut individuals = Vec::with_capacity(persons.len());
        let mut head_up = 0;
        let mut head_down = 0;

        for (detection_index, detection) in persons.iter().enumerate() {
            let orientation = self.classifier.classify(frame, &detection.bbox);
            let identity =
                self.resolver
                    .resolve(frame, &detection.bbox, frame_index, detection_index);

            match orientation {
                OrientationLabel::Up => head_up += 1,
                OrientationLabel::Down => head_down += 1,
                OrientationLabel::Unknown => {}
            }

            let instantaneous_rate = orientation.rate();
            let smoothed_rate = match instantaneous_rate {
                Some(rate) => Some(self.state.record_identity(&identity, rate)),
                None => self.state.identity_mean(&identity),
            };

            individuals.push(IndividualRecord {
                frame: frame_index,
                identity,
                orientation,
                instantaneous_rate,
                smoothed_rate,
                bbox: detection.bbox,
            });
        }

        let head_up_rate = head_up as f64 / persons.len().max(1) as f64;
        let head_up_rate_smooth = self.state.record_global(head_up_rate);
        self.state.end_frame();

        log::debug!(
            "Frame {frame_index}: {} persons, {head_up} up, {head_down} down, rate {head_up_rate:.2} (smooth {head_up_rate_smooth:.2})",
            persons.len()
        );

        FrameResult {
            frame: frame_index,
            persons: persons.len(),
            head_up,
            head_down,
            head_up_rate,
            head_up_rate_smooth,
            individuals,
            identities_count: self.state.identity_count(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn state(&self) -> &AnalysisState {
        &self.state
    }
}
