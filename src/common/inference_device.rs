use serde::{Deserialize, Serialize};

/// Execution provider the engine is built for.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InferenceDevice {
    #[default]
    Cpu,
    Cuda(usize),
    #[serde(rename = "tensorrt")]
    TensorRT(usize),
}

// Hardcoded device names. Storing the "proper" spelling and the lowercase version.
const CPU: [&str; 2] = ["CPU", "cpu"];
const CUDA: [&str; 2] = ["CUDA", "cuda"];
const TENSOR_RT: [&str; 2] = ["TensorRT", "tensorrt"];

impl InferenceDevice {
    pub fn from_str(device: &str, device_id: usize) -> Option<Self> {
        match device.to_lowercase().as_str() {
            "cpu" => Some(InferenceDevice::Cpu),
            "cuda" => Some(InferenceDevice::Cuda(device_id)),
            "tensorrt" | "trt" => Some(InferenceDevice::TensorRT(device_id)),
            _ => None,
        }
    }

    /// Parses `cpu`, `cuda`, `cuda:1`, `tensorrt:0`, ...
    pub fn parse(spec: &str) -> Option<Self> {
        match spec.split_once(':') {
            Some((name, id)) => Self::from_str(name, id.trim().parse().ok()?),
            None => Self::from_str(spec, 0),
        }
    }

    pub fn str(&self) -> &'static str {
        match self {
            InferenceDevice::Cpu => CPU[0],
            InferenceDevice::Cuda(_) => CUDA[0],
            InferenceDevice::TensorRT(_) => TENSOR_RT[0],
        }
    }

    pub fn str_lowercase(&self) -> &'static str {
        match self {
            InferenceDevice::Cpu => CPU[1],
            InferenceDevice::Cuda(_) => CUDA[1],
            InferenceDevice::TensorRT(_) => TENSOR_RT[1],
        }
    }

    pub fn device_id(&self) -> usize {
        match self {
            InferenceDevice::Cpu => 0,
            InferenceDevice::Cuda(id) | InferenceDevice::TensorRT(id) => *id,
        }
    }

    pub fn all_inference_devices() -> Vec<String> {
        vec![
            InferenceDevice::Cpu.str_lowercase().to_string(),
            InferenceDevice::Cuda(0).str_lowercase().to_string(),
            InferenceDevice::TensorRT(0).str_lowercase().to_string(),
        ]
    }
}

impl std::fmt::Display for InferenceDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceDevice::Cpu => f.write_str(self.str()),
            _ => write!(f, "{}:{}", self.str(), self.device_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_device_with_optional_id() {
        assert_eq!(InferenceDevice::parse("cpu"), Some(InferenceDevice::Cpu));
        assert_eq!(InferenceDevice::parse("CUDA"), Some(InferenceDevice::Cuda(0)));
        assert_eq!(
            InferenceDevice::parse("tensorrt:1"),
            Some(InferenceDevice::TensorRT(1))
        );
        assert_eq!(InferenceDevice::parse("tensorrt:x"), None);
        assert_eq!(InferenceDevice::parse("npu"), None);
    }

    #[test]
    fn display_includes_device_id() {
        assert_eq!(InferenceDevice::TensorRT(2).to_string(), "TensorRT:2");
        assert_eq!(InferenceDevice::Cpu.to_string(), "CPU");
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&InferenceDevice::TensorRT(0)).unwrap();
        assert_eq!(json, r#"{"tensorrt":0}"#);
        let back: InferenceDevice = serde_json::from_str(r#""cpu""#).unwrap();
        assert_eq!(back, InferenceDevice::Cpu);
    }
}
