//! Caller-supplied generation requests.

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::path::PathBuf;

/// A single video generation request.
///
/// Built once by the caller and then only read by the orchestrator and engines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Text prompt.
    pub prompt: String,

    /// Optional source image for image-to-video engines.
    pub image_path: Option<PathBuf>,

    /// Target clip length in seconds.
    pub duration_secs: f64,

    /// Target frame rate.
    pub fps: u32,

    /// Target width in pixels.
    pub width: u32,

    /// Target height in pixels.
    pub height: u32,

    /// Motion strength in `[0, 1]`.
    pub motion_intensity: f64,

    /// Optional random seed.
    pub seed: Option<u64>,

    /// Output container tag, e.g. "mp4".
    pub output_format: String,

    /// Directory engines write artifacts into.
    pub output_dir: PathBuf,

    /// Engine-specific parameters passed through untouched.
    pub params: HashMap<String, Value>,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            image_path: None,
            duration_secs: 5.0,
            fps: 24,
            width: 1024,
            height: 1024,
            motion_intensity: 0.5,
            seed: None,
            output_format: "mp4".to_string(),
            output_dir: PathBuf::from("output/videos"),
            params: HashMap::new(),
        }
    }
}

impl GenerationRequest {
    /// Creates a text-to-video request with default settings.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), ..Self::default() }
    }

    /// Sets the source image.
    #[must_use]
    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    /// Sets the clip duration in seconds.
    #[must_use]
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = secs;
        self
    }

    /// Sets the frame rate.
    #[must_use]
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    /// Sets the output resolution.
    #[must_use]
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the motion strength.
    #[must_use]
    pub fn with_motion_intensity(mut self, intensity: f64) -> Self {
        self.motion_intensity = intensity;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Sets the output format tag.
    #[must_use]
    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Sets the output directory.
    #[must_use]
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Adds an engine-specific parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }

    /// Whether the request carries a source image.
    pub fn has_image(&self) -> bool {
        self.image_path.is_some()
    }

    /// Checks the request for contract violations.
    ///
    /// # Errors
    /// Returns `EngineError::InvalidRequest` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() && self.image_path.is_none() {
            return Err(EngineError::InvalidRequest(
                "a prompt or a source image is required".to_string(),
            ));
        }
        if !self.duration_secs.is_finite() || self.duration_secs <= 0.0 {
            return Err(EngineError::InvalidRequest(format!(
                "duration must be positive, got {}",
                self.duration_secs
            )));
        }
        if self.fps == 0 {
            return Err(EngineError::InvalidRequest("fps must be positive".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(EngineError::InvalidRequest(format!(
                "resolution must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if !(0.0..=1.0).contains(&self.motion_intensity) {
            return Err(EngineError::InvalidRequest(format!(
                "motion intensity must be within [0, 1], got {}",
                self.motion_intensity
            )));
        }
        Ok(())
    }

    /// Flattens the request into the parameter object remote engines forward
    /// to their provider. Entries from [`params`](Self::params) override the
    /// generic fields.
    pub fn engine_params(&self) -> Value {
        let mut object = Map::new();
        if let Some(image) = &self.image_path {
            object.insert("input_image".into(), json!(image.to_string_lossy()));
        }
        if !self.prompt.is_empty() {
            object.insert("prompt".into(), json!(self.prompt));
        }
        object.insert("duration".into(), json!(self.duration_secs));
        object.insert("fps".into(), json!(self.fps));
        object.insert("width".into(), json!(self.width));
        object.insert("height".into(), json!(self.height));
        object.insert("motion_intensity".into(), json!(self.motion_intensity));
        if let Some(seed) = self.seed {
            object.insert("seed".into(), json!(seed));
        }
        object.insert("output_format".into(), json!(self.output_format));
        for (key, value) in &self.params {
            object.insert(key.clone(), value.clone());
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = GenerationRequest::new("sunrise");
        assert_eq!(request.fps, 24);
        assert_eq!((request.width, request.height), (1024, 1024));
        assert_eq!(request.output_format, "mp4");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_request() {
        let request = GenerationRequest::new("   ");
        assert!(matches!(request.validate(), Err(EngineError::InvalidRequest(_))));

        let request = GenerationRequest::new("").with_image("frame.png");
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_numbers() {
        assert!(GenerationRequest::new("x").with_duration(0.0).validate().is_err());
        assert!(GenerationRequest::new("x").with_duration(f64::NAN).validate().is_err());
        assert!(GenerationRequest::new("x").with_fps(0).validate().is_err());
        assert!(GenerationRequest::new("x").with_resolution(0, 720).validate().is_err());
        assert!(GenerationRequest::new("x").with_motion_intensity(1.2).validate().is_err());
    }

    #[test]
    fn test_engine_params_bag_overrides() {
        let request = GenerationRequest::new("waves")
            .with_seed(7)
            .with_param("fps", json!(60))
            .with_param("quality", json!("speed"));
        let params = request.engine_params();

        assert_eq!(params["prompt"], "waves");
        assert_eq!(params["seed"], 7);
        assert_eq!(params["fps"], 60);
        assert_eq!(params["quality"], "speed");
        assert!(params.get("input_image").is_none());
    }
}
