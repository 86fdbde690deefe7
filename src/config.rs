//! Configuration types for cutting exam sheets and packaging quizzes.
//!
//! Cutting is controlled through [`CutConfig`], packaging through
//! [`PackageConfig`]. Both are built via a builder that clamps individual
//! setters and validates the whole struct once in `build()`, so a job never
//! starts with a configuration it cannot honour.

use crate::error::CutError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default render scale (pixels per page unit).
pub const DEFAULT_RESOLUTION: u32 = 2;
/// Default padding around each crop, in unscaled page units.
pub const DEFAULT_MARGIN: u32 = 8;
/// Default token appended to the question image name.
pub const DEFAULT_QUESTION_SUFFIX: &str = "9";

/// The five literal strings the anchor search looks for.
///
/// Search is exact and case-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorLabels {
    /// Label whose bottom edge (on page 1) is the top of the scan window.
    pub top: String,
    /// Label whose top edge (on page 1) is the bottom of the scan window.
    pub bottom: String,
    /// Question-number reference; the leftmost right edge of its matches
    /// bounds where a real question number may sit.
    pub question: String,
    /// Marker printed before the correct choice.
    pub correct_choice: String,
    /// Marker printed before every other choice.
    pub incorrect_choice: String,
}

impl Default for AnchorLabels {
    fn default() -> Self {
        Self {
            top: "Version".to_string(),
            bottom: "Page".to_string(),
            question: "1.".to_string(),
            correct_choice: "(O)".to_string(),
            incorrect_choice: "(X)".to_string(),
        }
    }
}

/// Configuration for cutting one document.
///
/// # Example
/// ```rust
/// use quizcut::CutConfig;
///
/// let config = CutConfig::builder()
///     .resolution(3)
///     .margin(6)
///     .build()
///     .unwrap();
/// assert_eq!(config.scaled_margin(), 18);
/// ```
#[derive(Clone)]
pub struct CutConfig {
    /// Render scale factor. Also the row and column sampling stride. Default: 2.
    pub resolution: u32,

    /// Padding above and below each content block, in unscaled units. Default: 8.
    pub margin: u32,

    /// Anchor strings searched on every page.
    pub labels: AnchorLabels,

    /// Token that marks a question image in the output names. Default: "9".
    pub question_suffix: String,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for CutConfig {
    fn default() -> Self {
        Self {
            resolution: DEFAULT_RESOLUTION,
            margin: DEFAULT_MARGIN,
            labels: AnchorLabels::default(),
            question_suffix: DEFAULT_QUESTION_SUFFIX.to_string(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for CutConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CutConfig")
            .field("resolution", &self.resolution)
            .field("margin", &self.margin)
            .field("labels", &self.labels)
            .field("question_suffix", &self.question_suffix)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn CutProgressCallback>"),
            )
            .finish()
    }
}

impl CutConfig {
    /// Create a new builder for `CutConfig`.
    pub fn builder() -> CutConfigBuilder {
        CutConfigBuilder {
            config: Self::default(),
        }
    }

    /// Margin in raster pixels, saturating at `u32::MAX`.
    pub fn scaled_margin(&self) -> u32 {
        self.margin.saturating_mul(self.resolution)
    }

    /// Build a config from the loosely typed option object accepted by the
    /// job surface, e.g. `{"resolution": 2, "margin": 8}`.
    ///
    /// Missing keys keep their defaults and unknown keys are ignored.
    pub fn from_options(options: &serde_json::Value) -> Result<CutConfig, CutError> {
        let Some(map) = options.as_object() else {
            if options.is_null() {
                return CutConfig::builder().build();
            }
            return Err(CutError::InvalidConfig(
                "options must be a JSON object".into(),
            ));
        };

        let read_u32 = |key: &str| -> Result<Option<u32>, CutError> {
            match map.get(key) {
                None | Some(serde_json::Value::Null) => Ok(None),
                Some(v) => v
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .map(Some)
                    .ok_or_else(|| {
                        CutError::InvalidConfig(format!(
                            "option '{key}' must be a non-negative integer, got {v}"
                        ))
                    }),
            }
        };

        let mut builder = CutConfig::builder();
        if let Some(r) = read_u32("resolution")? {
            builder.config.resolution = r;
        }
        if let Some(m) = read_u32("margin")? {
            builder.config.margin = m;
        }
        builder.build()
    }
}

/// Builder for [`CutConfig`].
#[derive(Debug)]
pub struct CutConfigBuilder {
    config: CutConfig,
}

impl CutConfigBuilder {
    pub fn resolution(mut self, scale: u32) -> Self {
        self.config.resolution = scale.clamp(1, 8);
        self
    }

    pub fn margin(mut self, margin: u32) -> Self {
        self.config.margin = margin;
        self
    }

    pub fn labels(mut self, labels: AnchorLabels) -> Self {
        self.config.labels = labels;
        self
    }

    pub fn question_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.question_suffix = suffix.into();
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<CutConfig, CutError> {
        let c = &self.config;
        if c.resolution == 0 || c.resolution > 8 {
            return Err(CutError::InvalidConfig(format!(
                "resolution must be 1–8, got {}",
                c.resolution
            )));
        }
        if c.question_suffix.is_empty() {
            return Err(CutError::InvalidConfig(
                "question suffix must not be empty".into(),
            ));
        }
        let labels = [
            ("top", &c.labels.top),
            ("bottom", &c.labels.bottom),
            ("question", &c.labels.question),
            ("correct choice", &c.labels.correct_choice),
            ("incorrect choice", &c.labels.incorrect_choice),
        ];
        if let Some((which, _)) = labels.iter().find(|(_, v)| v.is_empty()) {
            return Err(CutError::InvalidConfig(format!(
                "{which} anchor label must not be empty"
            )));
        }
        Ok(self.config)
    }
}

// ── Packaging ────────────────────────────────────────────────────────────

/// Configuration for building a QTI quiz archive from cut images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageConfig {
    /// Folder inside the archive that holds the images. Default: "Uploaded Media".
    pub media_dir: String,
    /// Must match the suffix used when cutting. Default: "9".
    pub question_suffix: String,
    /// Choice suffixes probed per question, in order. Default: `[0, 1, 2, 3]`.
    pub choice_pattern: Vec<u32>,
    /// Quiz time limit in minutes. Default: 75.
    pub time_limit_minutes: u32,
    /// Points awarded per question. Default: 1.0.
    pub points_per_question: f64,
    /// Let the LMS shuffle choices. Default: true.
    pub shuffle_choices: bool,
    /// Index (into the found choices) of the choice scored as correct. Default: 0.
    pub correct_choice_index: usize,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            media_dir: "Uploaded Media".to_string(),
            question_suffix: DEFAULT_QUESTION_SUFFIX.to_string(),
            choice_pattern: vec![0, 1, 2, 3],
            time_limit_minutes: 75,
            points_per_question: 1.0,
            shuffle_choices: true,
            correct_choice_index: 0,
        }
    }
}

impl PackageConfig {
    /// Create a new builder for `PackageConfig`.
    pub fn builder() -> PackageConfigBuilder {
        PackageConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PackageConfig`].
#[derive(Debug)]
pub struct PackageConfigBuilder {
    config: PackageConfig,
}

impl PackageConfigBuilder {
    pub fn media_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.media_dir = dir.into();
        self
    }

    pub fn question_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.config.question_suffix = suffix.into();
        self
    }

    pub fn choice_pattern(mut self, pattern: Vec<u32>) -> Self {
        self.config.choice_pattern = pattern;
        self
    }

    pub fn time_limit_minutes(mut self, minutes: u32) -> Self {
        self.config.time_limit_minutes = minutes;
        self
    }

    pub fn points_per_question(mut self, points: f64) -> Self {
        self.config.points_per_question = points.max(0.0);
        self
    }

    pub fn shuffle_choices(mut self, v: bool) -> Self {
        self.config.shuffle_choices = v;
        self
    }

    pub fn correct_choice_index(mut self, idx: usize) -> Self {
        self.config.correct_choice_index = idx;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PackageConfig, CutError> {
        let c = &self.config;
        if c.media_dir.trim().is_empty() || c.media_dir.contains(['/', '\\']) {
            return Err(CutError::InvalidConfig(format!(
                "media dir must be a single non-empty folder name, got '{}'",
                c.media_dir
            )));
        }
        if c.question_suffix.is_empty() {
            return Err(CutError::InvalidConfig(
                "question suffix must not be empty".into(),
            ));
        }
        if c.choice_pattern.is_empty() {
            return Err(CutError::InvalidConfig(
                "choice pattern must list at least one choice suffix".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_match_exam_layout() {
        let c = CutConfig::default();
        assert_eq!(c.resolution, 2);
        assert_eq!(c.margin, 8);
        assert_eq!(c.scaled_margin(), 16);
        assert_eq!(c.question_suffix, "9");
        assert_eq!(c.labels.top, "Version");
        assert_eq!(c.labels.incorrect_choice, "(X)");
    }

    #[test]
    fn builder_clamps_resolution() {
        let c = CutConfig::builder().resolution(0).build().unwrap();
        assert_eq!(c.resolution, 1);
        let c = CutConfig::builder().resolution(40).build().unwrap();
        assert_eq!(c.resolution, 8);
    }

    #[test]
    fn builder_rejects_empty_label() {
        let labels = AnchorLabels {
            bottom: String::new(),
            ..AnchorLabels::default()
        };
        let err = CutConfig::builder().labels(labels).build().unwrap_err();
        assert!(err.to_string().contains("bottom"), "got: {err}");
    }

    #[test]
    fn builder_rejects_empty_suffix() {
        assert!(CutConfig::builder().question_suffix("").build().is_err());
    }

    #[test]
    fn options_object_overrides_defaults() {
        let c = CutConfig::from_options(&json!({"resolution": 3, "margin": 4, "extra": true}))
            .unwrap();
        assert_eq!(c.resolution, 3);
        assert_eq!(c.margin, 4);

        let c = CutConfig::from_options(&json!({})).unwrap();
        assert_eq!(c.resolution, 2);

        let c = CutConfig::from_options(&serde_json::Value::Null).unwrap();
        assert_eq!(c.margin, 8);
    }

    #[test]
    fn options_object_rejects_bad_values() {
        assert!(CutConfig::from_options(&json!({"resolution": "high"})).is_err());
        assert!(CutConfig::from_options(&json!({"margin": -1})).is_err());
        assert!(CutConfig::from_options(&json!({"resolution": 0})).is_err());
        assert!(CutConfig::from_options(&json!([1, 2])).is_err());
    }

    #[test]
    fn huge_margin_saturates_instead_of_overflowing() {
        let c = CutConfig::from_options(&json!({"resolution": 2, "margin": 3_000_000_000u64}))
            .unwrap();
        assert_eq!(c.scaled_margin(), u32::MAX);

        let c = CutConfig::builder().resolution(8).margin(u32::MAX).build().unwrap();
        assert_eq!(c.scaled_margin(), u32::MAX);
    }

    #[test]
    fn package_defaults_and_validation() {
        let p = PackageConfig::default();
        assert_eq!(p.choice_pattern, vec![0, 1, 2, 3]);
        assert_eq!(p.time_limit_minutes, 75);

        assert!(PackageConfig::builder().media_dir("a/b").build().is_err());
        assert!(PackageConfig::builder().choice_pattern(vec![]).build().is_err());
        assert!(PackageConfig::builder()
            .points_per_question(-3.0)
            .build()
            .map(|c| c.points_per_question == 0.0)
            .unwrap());
    }
}
