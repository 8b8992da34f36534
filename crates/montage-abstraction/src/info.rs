//! Static capability descriptions.

use crate::kind::EngineKind;
use serde::{Deserialize, Serialize};

/// What an engine can do and what it costs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Engine identifier.
    pub kind: EngineKind,

    /// Human-readable engine name.
    pub name: String,

    /// Engine version reported by the provider.
    pub version: String,

    /// Short description.
    pub description: String,

    /// Whether the engine is free to use.
    pub is_free: bool,

    /// Accepts a source image (image-to-video).
    pub supports_image_input: bool,

    /// Accepts a text-only prompt (text-to-video).
    pub supports_text_input: bool,

    /// Longest clip the engine produces, in seconds.
    pub max_duration_secs: f64,

    /// Supported output resolutions as (width, height).
    pub supported_resolutions: Vec<(u32, u32)>,

    /// Supported frame rates.
    pub supported_fps: Vec<u32>,

    /// Declared cost per generated second (0 for free engines).
    pub cost_per_second: f64,

    /// Provider request quota per minute.
    pub rate_limit_per_minute: u32,

    /// Maximum number of concurrent generations on one instance.
    pub max_concurrent_tasks: u32,
}

impl EngineInfo {
    /// Creates a description with conservative defaults: free, image and
    /// text input, a single concurrent task.
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            name: kind.display_name().to_string(),
            version: "1.0".to_string(),
            description: String::new(),
            is_free: true,
            supports_image_input: true,
            supports_text_input: true,
            max_duration_secs: 10.0,
            supported_resolutions: vec![(1024, 1024)],
            supported_fps: vec![24],
            cost_per_second: 0.0,
            rate_limit_per_minute: 60,
            max_concurrent_tasks: 1,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the version string.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Marks the engine as paid with the given cost per second.
    #[must_use]
    pub fn with_cost_per_second(mut self, cost: f64) -> Self {
        self.cost_per_second = cost;
        self.is_free = cost <= 0.0;
        self
    }

    /// Sets which input modes are accepted.
    #[must_use]
    pub fn with_inputs(mut self, image: bool, text: bool) -> Self {
        self.supports_image_input = image;
        self.supports_text_input = text;
        self
    }

    /// Sets the maximum clip duration.
    #[must_use]
    pub fn with_max_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    /// Sets supported resolutions.
    #[must_use]
    pub fn with_resolutions(mut self, resolutions: Vec<(u32, u32)>) -> Self {
        self.supported_resolutions = resolutions;
        self
    }

    /// Sets supported frame rates.
    #[must_use]
    pub fn with_fps(mut self, fps: Vec<u32>) -> Self {
        self.supported_fps = fps;
        self
    }

    /// Sets the provider rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    /// Sets the per-instance concurrency cap.
    #[must_use]
    pub fn with_max_concurrent_tasks(mut self, max: u32) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    /// Whether this engine accepts the given input mode.
    pub fn supports_input(&self, has_image: bool) -> bool {
        if has_image { self.supports_image_input } else { self.supports_text_input }
    }
}
