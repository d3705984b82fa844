use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::common::{OutputLayout, TensorSpec};
use crate::data::EngineOptions;
use crate::error::{DetectError, Result};
use crate::utils;

/// Construction parameters of a detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub model_path: String,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub output_layout: OutputLayout,
    pub input_tensor: TensorSpec,
    pub output_tensor: TensorSpec,
    /// Rectified boxes narrower or shorter than this many pixels are dropped.
    /// `0` disables the check.
    pub min_box_size: f32,
    pub pad_value: u8,
    /// When set, boxes of different classes never suppress each other.
    pub class_aware_nms: bool,
    pub class_names: Vec<String>,
    /// One class name per line. Used when `class_names` is empty.
    pub labels_path: Option<String>,
    pub verbose: bool,
    pub engine: EngineOptions,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_path: String::new(),
            confidence_threshold: 0.5,
            iou_threshold: 0.3,
            output_layout: OutputLayout::CenterTransposed,
            input_tensor: TensorSpec::new("images", &[1, 3, 640, 640]),
            output_tensor: TensorSpec::new("output0", &[1, 5, 8400]),
            min_box_size: 0.0,
            pad_value: 114,
            class_aware_nms: false,
            class_names: vec![],
            labels_path: None,
            verbose: false,
            engine: EngineOptions::default(),
        }
    }
}

#[allow(dead_code)]
impl DetectorConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read detector config {}", path.display()))?;
        let config: Self = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse detector config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_model(mut self, model_path: &str) -> Self {
        self.model_path = model_path.to_string();
        self
    }

    pub fn with_confidence_threshold(mut self, x: f32) -> Self {
        self.confidence_threshold = x;
        self
    }

    pub fn with_iou_threshold(mut self, x: f32) -> Self {
        self.iou_threshold = x;
        self
    }

    pub fn with_output_layout(mut self, layout: OutputLayout) -> Self {
        self.output_layout = layout;
        self
    }

    pub fn with_input_tensor(mut self, name: &str, shape: &[usize]) -> Self {
        self.input_tensor = TensorSpec::new(name, shape);
        self
    }

    pub fn with_output_tensor(mut self, name: &str, shape: &[usize]) -> Self {
        self.output_tensor = TensorSpec::new(name, shape);
        self
    }

    pub fn with_min_box_size(mut self, x: f32) -> Self {
        self.min_box_size = x;
        self
    }

    pub fn with_pad_value(mut self, x: u8) -> Self {
        self.pad_value = x;
        self
    }

    pub fn with_class_aware_nms(mut self, x: bool) -> Self {
        self.class_aware_nms = x;
        self
    }

    pub fn with_names(mut self, names: &[&str]) -> Self {
        self.class_names = names.iter().map(|x| x.to_string()).collect();
        self
    }

    pub fn with_verbose(mut self, x: bool) -> Self {
        self.verbose = x;
        self
    }

    pub fn with_engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    /// `(height, width)` of the model input.
    pub fn input_hw(&self) -> Result<(u32, u32)> {
        self.input_tensor.image_hw().ok_or_else(|| {
            DetectError::shape_mismatch(&self.input_tensor.name, &[1, 3, 0, 0], &self.input_tensor.shape)
        })
    }

    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, x: f32| {
            if x.is_finite() && (0.0..=1.0).contains(&x) {
                Ok(())
            } else {
                Err(DetectError::InvalidConfig(format!("{name} must be within [0, 1], got {x}")))
            }
        };
        unit("confidence_threshold", self.confidence_threshold)?;
        unit("iou_threshold", self.iou_threshold)?;

        if !self.min_box_size.is_finite() || self.min_box_size < 0.0 {
            return Err(DetectError::InvalidConfig(format!(
                "min_box_size must be a non-negative number, got {}",
                self.min_box_size
            )));
        }

        self.input_hw()?;
        self.output_layout
            .candidate_count(&self.output_tensor.name, &self.output_tensor.shape)?;

        if let Some(nc) = self.output_layout.num_classes() {
            if !self.class_names.is_empty() && self.class_names.len() != nc {
                return Err(DetectError::InvalidConfig(format!(
                    "{} class names configured for a {nc}-class output layout",
                    self.class_names.len()
                )));
            }
        }
        Ok(())
    }

    /// Configured class names, falling back to `labels_path`.
    pub fn resolve_class_names(&self) -> anyhow::Result<Vec<String>> {
        if !self.class_names.is_empty() {
            return Ok(self.class_names.clone());
        }
        match &self.labels_path {
            Some(path) => utils::file_to_vec(path)
                .with_context(|| format!("Failed to read labels file {path}")),
            None => Ok(vec![]),
        }
    }
}
