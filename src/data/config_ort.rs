//! Options for building the ONNX Runtime session behind a detector.

use serde::{Deserialize, Serialize};

use crate::common::InferenceDevice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub device: InferenceDevice,
    /// Shared ONNX Runtime library to load. Empty uses the system default.
    pub ort_lib_path: String,
    pub num_dry_run: usize,

    // trt related
    pub trt_engine_cache_enable: bool,
    /// Engine cache directory. Empty places it under the user cache dir.
    pub trt_engine_cache_path: String,
    pub trt_fp16_enable: bool,
    pub trt_int8_enable: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            device: InferenceDevice::Cpu,
            ort_lib_path: String::new(),
            num_dry_run: 3,

            trt_engine_cache_enable: true,
            trt_engine_cache_path: String::new(),
            trt_fp16_enable: false,
            trt_int8_enable: false,
        }
    }
}

#[allow(dead_code)]
impl EngineOptions {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_device(mut self, device: InferenceDevice) -> Self {
        self.device = device;
        self
    }

    pub fn with_ort_lib_path(mut self, ort_lib_path: &str) -> Self {
        self.ort_lib_path = ort_lib_path.to_string();
        self
    }

    pub fn with_dry_run(mut self, n: usize) -> Self {
        self.num_dry_run = n;
        self
    }

    pub fn with_trt_engine_cache(mut self, enable: bool, path: &str) -> Self {
        self.trt_engine_cache_enable = enable;
        self.trt_engine_cache_path = path.to_string();
        self
    }

    pub fn with_trt_fp16(mut self, x: bool) -> Self {
        self.trt_fp16_enable = x;
        self
    }

    pub fn with_trt_int8(mut self, x: bool) -> Self {
        self.trt_int8_enable = x;
        self
    }
}
