/// Gallery-based identifier comparing hue–saturation histograms.
///
/// Each known person is a set of face images under `<gallery>/<name>/`. A
/// detection is matched by locating the largest face inside its person box
/// and correlating that face's histogram with every reference histogram.
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::detection::domain::face_detector::{largest_face, FaceDetector};
use crate::identity::domain::face_identifier::FaceIdentifier;
use crate::shared::bbox::BoundingBox;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;

const HUE_BINS: usize = 32;
const SAT_BINS: usize = 32;

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to read gallery directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct GalleryPerson {
    name: String,
    histograms: Vec<Vec<f64>>,
}

pub struct HistogramGalleryIdentifier {
    people: Vec<GalleryPerson>,
    unknown_threshold: f64,
    face_detector: Box<dyn FaceDetector>,
}

impl HistogramGalleryIdentifier {
    /// Loads `<dir>/<person_name>/*.<image>`, one subdirectory per person.
    /// Reference images are taken to be face crops and used whole.
    ///
    /// A missing gallery yields an identifier that never matches. Unreadable
    /// images are skipped with a warning.
    pub fn from_dir(
        dir: &Path,
        unknown_threshold: f64,
        face_detector: Box<dyn FaceDetector>,
    ) -> Result<Self, GalleryError> {
        if !dir.exists() {
            log::warn!(
                "Face gallery {} not found; every face will be Unknown",
                dir.display()
            );
            return Ok(Self::from_references(
                Vec::new(),
                unknown_threshold,
                face_detector,
            ));
        }

        let mut person_dirs = list_dir(dir)?
            .into_iter()
            .filter(|p| p.is_dir())
            .collect::<Vec<_>>();
        person_dirs.sort();

        let mut references = Vec::new();
        for person_dir in person_dirs {
            let name = match person_dir.file_name() {
                Some(n) => n.to_string_lossy().into_owned(),
                None => continue,
            };
            let mut image_paths: Vec<PathBuf> = list_dir(&person_dir)?
                .into_iter()
                .filter(|p| has_image_extension(p))
                .collect();
            image_paths.sort();

            let frames: Vec<Frame> = image_paths
                .iter()
                .filter_map(|path| match image::open(path) {
                    Ok(img) => Some(Frame::from_rgb_image(img.to_rgb8(), 0)),
                    Err(e) => {
                        log::warn!("Skipping gallery image {}: {e}", path.display());
                        None
                    }
                })
                .collect();
            references.push((name, frames));
        }

        let identifier = Self::from_references(references, unknown_threshold, face_detector);
        log::info!(
            "Loaded face gallery with {} people from {}",
            identifier.person_count(),
            dir.display()
        );
        Ok(identifier)
    }

    /// Builds a gallery from in-memory face images. People without images
    /// are dropped.
    pub fn from_references(
        references: Vec<(String, Vec<Frame>)>,
        unknown_threshold: f64,
        face_detector: Box<dyn FaceDetector>,
    ) -> Self {
        let people = references
            .into_iter()
            .filter(|(_, frames)| !frames.is_empty())
            .map(|(name, frames)| GalleryPerson {
                name,
                histograms: frames.iter().map(frame_histogram).collect(),
            })
            .collect();
        Self {
            people,
            unknown_threshold,
            face_detector,
        }
    }

    pub fn person_count(&self) -> usize {
        self.people.len()
    }

    /// Closest gallery person and its distance `(1 - correlation) * 100`.
    fn best_match(&self, histogram: &[f64]) -> Option<(&str, f64)> {
        self.people
            .iter()
            .flat_map(|person| {
                person
                    .histograms
                    .iter()
                    .map(move |reference| (person.name.as_str(), reference))
            })
            .map(|(name, reference)| {
                let distance = (1.0 - pearson_correlation(histogram, reference)) * 100.0;
                (name, distance)
            })
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
    }
}

impl FaceIdentifier for HistogramGalleryIdentifier {
    fn identify(
        &mut self,
        frame: &Frame,
        bbox: &BoundingBox,
    ) -> Result<Option<String>, Box<dyn std::error::Error>> {
        if self.people.is_empty() {
            return Ok(None);
        }
        let Some(person) = frame.crop(bbox) else {
            log::debug!("Person box {bbox:?} has no pixels inside the frame");
            return Ok(None);
        };

        let faces = self.face_detector.detect(&person)?;
        let Some(face) = largest_face(&faces)
            .and_then(|f| f.clamp_to(person.width(), person.height()))
        else {
            log::debug!("No face found in person box {bbox:?}");
            return Ok(None);
        };

        let histogram = region_histogram(&person, &face);
        match self.best_match(&histogram) {
            Some((name, distance)) if distance <= self.unknown_threshold => {
                log::debug!("Matched {name} at distance {distance:.1}");
                Ok(Some(name.to_string()))
            }
            _ => Ok(None),
        }
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, GalleryError> {
    let read_err = |source| GalleryError::ReadDir {
        path: dir.to_path_buf(),
        source,
    };
    fs::read_dir(dir)
        .map_err(read_err)?
        .map(|entry| entry.map(|e| e.path()).map_err(read_err))
        .collect()
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn frame_histogram(frame: &Frame) -> Vec<f64> {
    let whole = BoundingBox::new(0, 0, frame.width() as i32, frame.height() as i32);
    region_histogram(frame, &whole)
}

/// Normalized 2D hue–saturation histogram over `region` (inside the frame).
fn region_histogram(frame: &Frame, region: &BoundingBox) -> Vec<f64> {
    let pixels = frame.as_ndarray();
    let gray = frame.channels() < 3;
    let mut hist = vec![0.0f64; HUE_BINS * SAT_BINS];
    let mut count = 0usize;

    for row in region.y1.max(0) as usize..region.y2.max(0) as usize {
        for col in region.x1.max(0) as usize..region.x2.max(0) as usize {
            let channel = |c: usize| {
                let c = if gray { 0 } else { c };
                pixels[[row, col, c]] as f64 / 255.0
            };
            let (h, s, _v) = rgb_to_hsv(channel(0), channel(1), channel(2));

            let h_bin = ((h / 360.0) * HUE_BINS as f64).min(HUE_BINS as f64 - 1.0) as usize;
            let s_bin = (s * SAT_BINS as f64).min(SAT_BINS as f64 - 1.0) as usize;
            hist[h_bin * SAT_BINS + s_bin] += 1.0;
            count += 1;
        }
    }

    if count > 0 {
        let total = count as f64;
        for v in &mut hist {
            *v /= total;
        }
    }
    hist
}

fn rgb_to_hsv(r: f64, g: f64, b: f64) -> (f64, f64, f64) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta) % 6.0)
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (if h < 0.0 { h + 360.0 } else { h }, s, max)
}

/// Pearson correlation; 1.0 if both inputs are flat, 0.0 if only one is.
fn pearson_correlation(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let mean_a = a[..n].iter().sum::<f64>() / n as f64;
    let mean_b = b[..n].iter().sum::<f64>() / n as f64;

    let (mut cov, mut var_a, mut var_b) = (0.0, 0.0, 0.0);
    for (x, y) in a[..n].iter().zip(&b[..n]) {
        let da = x - mean_a;
        let db = y - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom < f64::EPSILON {
        return if var_a < f64::EPSILON && var_b < f64::EPSILON {
            1.0
        } else {
            0.0
        };
    }
    cov / denom
}
