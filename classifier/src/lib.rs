//! Image labelling for Galleryze.
//!
//! No inference model is loaded. Labels are derived from the lower-cased file
//! name so the rest of the gallery can be exercised against a fixed contract.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Minimum detection confidence used by [`Classifier::categorize`] by default.
pub const DEFAULT_THRESHOLD: f32 = 0.35;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("Invalid Arguments: {0}")]
    InvalidArguments(String),
}

/// A labelled result with its confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
    pub confidence: f32,
}

impl Label {
    fn new(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
        }
    }
}

/// Gallery bucket an image is sorted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Docs,
    People,
    Animal,
    Nature,
    Food,
    Others,
}

impl Bucket {
    pub const ALL: [Bucket; 6] = [
        Bucket::Docs,
        Bucket::People,
        Bucket::Animal,
        Bucket::Nature,
        Bucket::Food,
        Bucket::Others,
    ];

    fn from_detection(label: &str) -> Option<Self> {
        match label {
            "book" => Some(Bucket::Docs),
            "person" => Some(Bucket::People),
            _ => None,
        }
    }

    fn from_class(label: &str) -> Self {
        match label {
            "class_animal" => Bucket::Animal,
            "class_nature" => Bucket::Nature,
            "class_food" => Bucket::Food,
            _ => Bucket::Others,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Bucket::Docs => "Docs",
            Bucket::People => "People",
            Bucket::Animal => "Animal",
            Bucket::Nature => "Nature",
            Bucket::Food => "Food",
            Bucket::Others => "Others",
        };
        write!(f, "{}", s)
    }
}

const DETECTION_RULES: &[(&[&str], &str, f32)] = &[
    (&["doc"], "book", 0.95),
    (&["people", "person", "me", "suit"], "person", 0.95),
];

const CLASS_RULES: &[(&[&str], &str, f32)] = &[
    (&["cat", "dog", "pet", "animal"], "class_animal", 0.9),
    (
        &["nature", "flower", "tree", "park", "road", "building", "mandir"],
        "class_nature",
        0.9,
    ),
    (&["food", "chicken"], "class_food", 0.9),
];

const FALLBACK_CLASS: (&str, f32) = ("class_others", 0.5);

fn file_name(image_path: &str) -> Result<String, ClassifierError> {
    if image_path.trim().is_empty() {
        return Err(ClassifierError::InvalidArguments("Missing image path".into()));
    }
    let name = Path::new(image_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| image_path.to_string());
    Ok(name.to_lowercase())
}

fn first_match(name: &str, rules: &[(&[&str], &str, f32)]) -> Option<Label> {
    rules
        .iter()
        .find(|(needles, _, _)| needles.iter().any(|n| name.contains(n)))
        .map(|(_, label, confidence)| Label::new(label, *confidence))
}

#[derive(Debug, Default)]
pub struct Classifier {
    loaded: bool,
}

impl Classifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always succeeds; there is no model to load.
    pub fn load_models(&mut self) -> Result<(), ClassifierError> {
        self.loaded = true;
        tracing::debug!("Classifier ready (filename rules)");
        Ok(())
    }

    pub fn close_models(&mut self) -> Result<(), ClassifierError> {
        self.loaded = false;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// At most one detection, or none when the name matches no rule.
    pub fn detect_objects(&self, image_path: &str) -> Result<Vec<Label>, ClassifierError> {
        let name = file_name(image_path)?;
        Ok(first_match(&name, DETECTION_RULES).into_iter().collect())
    }

    pub fn classify_image(&self, image_path: &str) -> Result<Label, ClassifierError> {
        let name = file_name(image_path)?;
        Ok(first_match(&name, CLASS_RULES)
            .unwrap_or_else(|| Label::new(FALLBACK_CLASS.0, FALLBACK_CLASS.1)))
    }

    /// Detector first, then classifier. Detections below `threshold` are ignored.
    pub fn categorize(&self, image_path: &str, threshold: f32) -> Result<Bucket, ClassifierError> {
        for detection in self.detect_objects(image_path)? {
            if detection.confidence < threshold {
                continue;
            }
            if let Some(bucket) = Bucket::from_detection(&detection.label) {
                return Ok(bucket);
            }
        }
        let class = self.classify_image(image_path)?;
        Ok(Bucket::from_class(&class.label))
    }
}
