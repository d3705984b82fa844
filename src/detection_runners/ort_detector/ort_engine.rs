//! ONNX Runtime backend.
//!
//! The session runs on the TensorRT, CUDA or CPU execution provider and owns
//! its accelerator memory internally. It is bound to [`HostAccelerator`]: the
//! input is read from the bound input region, the session is run, and the
//! result is written to the bound output region, all within `enqueue`.

use half::{bf16, f16};
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, ExecutionProvider,
        TensorRTExecutionProvider,
    },
    session::builder::{GraphOptimizationLevel, SessionBuilder},
    session::{Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, Value, ValueType},
};
use regex::Regex;

use crate::common::{
    DetectorConfig, DevicePtr, HostAccelerator, HostStream, InferenceDevice, TensorSpec,
};
use crate::data::FsAccess;
use crate::detection_runners::{InferenceEngine, TensorBindings};
use crate::error::{DetectError, Result};
use crate::utils::human_bytes;

const CROSS_MARK: &str = "❌";

#[derive(Debug)]
pub struct OrtEngine {
    session: Session,
    device: InferenceDevice,
    input: TensorSpec,
    input_dtype: TensorElementType,
    output: TensorSpec,
    output_dtype: TensorElementType,
    bindings: TensorBindings,
    names: Vec<String>,
}

impl OrtEngine {
    /// Loads `config.model_path` and builds a session on the configured
    /// execution provider.
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let model_load = |reason: String| DetectError::ModelLoad {
            path: config.model_path.clone(),
            reason,
        };

        let blob = std::fs::read(&config.model_path).map_err(|e| model_load(e.to_string()))?;

        let options = &config.engine;
        if !options.ort_lib_path.is_empty() {
            match ort::init_from(&options.ort_lib_path).commit() {
                Ok(_) => {}
                Err(e) => return Err(model_load(format!("Failed to commit ORT: {e:?}"))),
            }
        }

        let mut builder = Session::builder()?;
        let mut device = options.device;
        match device {
            InferenceDevice::TensorRT(device_id) => {
                let cache_path = if options.trt_engine_cache_path.is_empty() {
                    FsAccess::Cache
                        .path_with_subs(&["trt_engines"])
                        .map_err(|e| model_load(e.to_string()))?
                        .display()
                        .to_string()
                } else {
                    options.trt_engine_cache_path.clone()
                };
                Self::build_trt(
                    &mut builder,
                    device_id,
                    options.trt_int8_enable,
                    options.trt_fp16_enable,
                    options.trt_engine_cache_enable,
                    &cache_path,
                )
                .map_err(model_load)?;
            }
            InferenceDevice::Cuda(device_id) => {
                Self::build_cuda(&mut builder, device_id).unwrap_or_else(|err| {
                    log::warn!("{err}, Using cpu");
                    device = InferenceDevice::Cpu;
                })
            }
            InferenceDevice::Cpu => {
                Self::build_cpu(&mut builder).map_err(model_load)?;
            }
        }

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .commit_from_memory(&blob)
            .map_err(|e| model_load(e.to_string()))?;

        let (input, input_dtype) = Self::resolve_io(
            session.inputs.iter().map(|x| (x.name.as_str(), &x.input_type)),
            &config.input_tensor,
        )?;
        let (output, output_dtype) = Self::resolve_io(
            session.outputs.iter().map(|x| (x.name.as_str(), &x.output_type)),
            &config.output_tensor,
        )?;

        let mut engine = Self {
            bindings: TensorBindings::new(&[&input, &output]),
            session,
            device,
            input,
            input_dtype,
            output,
            output_dtype,
            names: vec![],
        };
        engine.names = engine.fetch_names().unwrap_or_default();

        log::info!(
            "Backend: ONNXRuntime | Device: {} | Model: {} | Input: {} ({:?}) | Output: {} ({:?})",
            engine.device,
            human_bytes(blob.len() as f64),
            engine.input,
            engine.input_dtype,
            engine.output,
            engine.output_dtype,
        );
        Ok(engine)
    }

    fn build_trt(
        builder: &mut SessionBuilder,
        device_id: usize,
        int8_enable: bool,
        fp16_enable: bool,
        engine_cache_enable: bool,
        engine_cache_path: &str,
    ) -> std::result::Result<(), String> {
        let trt = TensorRTExecutionProvider::default()
            .with_device_id(device_id as i32)
            .with_int8(int8_enable)
            .with_fp16(fp16_enable)
            .with_engine_cache(engine_cache_enable)
            .with_engine_cache_path(engine_cache_path)
            .with_timing_cache(false);
        match trt.is_available() {
            Ok(true) => {
                trt.register(builder)
                    .map_err(|err| format!("{CROSS_MARK} TensorRT initialization failed: {err:?}"))?;
                log::info!("🐢 Initial model serialization with TensorRT may take some time...");
                Ok(())
            }
            _ => Err(format!("{CROSS_MARK} TensorRT execution provider not available")),
        }
    }

    fn build_cuda(builder: &mut SessionBuilder, device_id: usize) -> std::result::Result<(), String> {
        let ep = CUDAExecutionProvider::default().with_device_id(device_id as i32);
        match ep.is_available() {
            Ok(true) => ep
                .register(builder)
                .map_err(|err| format!("{CROSS_MARK} CUDA initialization failed: {err:?}")),
            _ => Err(format!("{CROSS_MARK} CUDA execution provider not available")),
        }
    }

    fn build_cpu(builder: &mut SessionBuilder) -> std::result::Result<(), String> {
        let ep = CPUExecutionProvider::default();
        match ep.is_available() {
            Ok(true) => ep
                .register(builder)
                .map_err(|err| format!("{CROSS_MARK} CPU initialization failed: {err:?}")),
            _ => Err(format!("{CROSS_MARK} CPU execution provider not available")),
        }
    }

    /// Picks the tensor named like `wanted` (or the first one) and settles its
    /// shape. Dynamic model dimensions take the configured value; static ones
    /// must agree with it.
    fn resolve_io<'a>(
        mut ios: impl Iterator<Item = (&'a str, &'a ValueType)> + Clone,
        wanted: &TensorSpec,
    ) -> Result<(TensorSpec, TensorElementType)> {
        let (name, value_type) = ios
            .clone()
            .find(|(name, _)| *name == wanted.name)
            .or_else(|| ios.next())
            .ok_or_else(|| DetectError::InvalidConfig("model has no tensors".to_string()))?;
        let (ty, dims): (TensorElementType, Vec<i64>) = match value_type {
            ValueType::Tensor { ty, shape, .. } => (*ty, shape.iter().copied().collect()),
            other => {
                return Err(DetectError::InvalidConfig(format!(
                    "tensor `{name}` is not a tensor: {other:?}"
                )))
            }
        };

        let mismatch = || DetectError::shape_mismatch(name, &wanted.shape, &dims_to_usize(&dims));
        if dims.len() != wanted.shape.len() {
            return Err(mismatch());
        }
        let mut shape = Vec::with_capacity(dims.len());
        for (&d, &w) in dims.iter().zip(wanted.shape.iter()) {
            match d {
                d if d <= 0 => shape.push(w),
                d if d as usize == w => shape.push(w),
                _ => return Err(mismatch()),
            }
        }
        if name != wanted.name {
            log::warn!("No tensor named `{}`, using `{name}`", wanted.name);
        }
        Ok((TensorSpec::new(name, &shape), ty))
    }

    fn tensor_preprocess(x: Array<f32, IxDyn>, dtype: TensorElementType) -> Result<DynValue> {
        let x = match dtype {
            TensorElementType::Float32 => Value::from_array(x)?.into_dyn(),
            TensorElementType::Float64 => Value::from_array(x.mapv(|x_| x_ as f64))?.into_dyn(),
            TensorElementType::Float16 => Value::from_array(x.mapv(f16::from_f32))?.into_dyn(),
            TensorElementType::Bfloat16 => Value::from_array(x.mapv(bf16::from_f32))?.into_dyn(),
            TensorElementType::Uint8 => {
                Value::from_array(x.mapv(|x_| (x_ * 255.0).round() as u8))?.into_dyn()
            }
            _ => {
                return Err(DetectError::InvalidConfig(format!(
                    "unsupported input tensor type: {dtype:?}"
                )))
            }
        };
        Ok(x)
    }

    fn tensor_postprocess(x: &DynValue, dtype: TensorElementType) -> Result<Array<f32, IxDyn>> {
        fn extract<T>(x: &DynValue, map_fn: impl Fn(T) -> f32) -> Result<Array<f32, IxDyn>>
        where
            T: Clone + 'static + ort::tensor::PrimitiveTensorElementType,
        {
            let view = x
                .try_extract_array::<T>()
                .map_err(|e| DetectError::Execution(format!("failed to extract output: {e}")))?;
            Ok(view.mapv(map_fn))
        }
        match dtype {
            TensorElementType::Float32 => extract::<f32>(x, |x| x),
            TensorElementType::Float16 => extract::<f16>(x, f16::to_f32),
            TensorElementType::Bfloat16 => extract::<bf16>(x, bf16::to_f32),
            TensorElementType::Float64 => extract::<f64>(x, |x| x as f32),
            TensorElementType::Int64 => extract::<i64>(x, |x| x as f32),
            TensorElementType::Int32 => extract::<i32>(x, |x| x as f32),
            _ => Err(DetectError::InvalidConfig(format!(
                "unsupported output tensor type: {dtype:?}"
            ))),
        }
    }

    fn try_fetch(&self, key: &str) -> Option<String> {
        match self.session.metadata() {
            Err(_) => None,
            Ok(metadata) => metadata.custom(key).unwrap_or_default(),
        }
    }

    /// Class names from the model metadata.
    ///
    /// String format: `{0: 'person', 1: 'bicycle', 2: 'sports ball', ...}`
    fn fetch_names(&self) -> Option<Vec<String>> {
        let names = self.try_fetch("names")?;
        Some(parse_names(&names))
    }

    pub fn device(&self) -> InferenceDevice {
        self.device
    }
}

impl InferenceEngine<HostAccelerator> for OrtEngine {
    fn input_spec(&self) -> &TensorSpec {
        &self.input
    }

    fn output_spec(&self) -> &TensorSpec {
        &self.output
    }

    fn bind_address(&mut self, tensor: &str, ptr: DevicePtr) -> Result<()> {
        self.bindings.bind(tensor, ptr)
    }

    fn enqueue(&mut self, accel: &HostAccelerator, _stream: &HostStream) -> Result<()> {
        let input_ptr = self.bindings.get(&self.input.name)?;
        let output_ptr = self.bindings.get(&self.output.name)?;

        let x = accel
            .with_device(input_ptr, |data| {
                Array::from_shape_vec(IxDyn(&self.input.shape), data.to_vec())
            })
            .map_err(DetectError::Transfer)?
            .map_err(|_| {
                DetectError::shape_mismatch(&self.input.name, &self.input.shape, &[])
            })?;
        let xs_ = [SessionInputValue::from(Self::tensor_preprocess(x, self.input_dtype)?)];

        let outputs = self
            .session
            .run(&xs_[..])
            .map_err(|e| DetectError::Execution(e.to_string()))?;
        let y = Self::tensor_postprocess(&outputs[self.output.name.as_str()], self.output_dtype)?;

        if y.shape() != self.output.shape.as_slice() {
            return Err(DetectError::shape_mismatch(
                &self.output.name,
                &self.output.shape,
                y.shape(),
            ));
        }
        let flat: Vec<f32> = y.iter().copied().collect();
        accel
            .write_device(output_ptr, &flat)
            .map_err(DetectError::Transfer)
    }

    fn class_names(&self) -> &[String] {
        &self.names
    }
}

fn dims_to_usize(dims: &[i64]) -> Vec<usize> {
    dims.iter().map(|&d| d.max(0) as usize).collect()
}

pub(crate) fn parse_names(names: &str) -> Vec<String> {
    let re = match Regex::new(r#"(['"])([-()\w '"]+)(['"])"#) {
        Ok(re) => re,
        Err(_) => return vec![],
    };
    re.captures_iter(names)
        .map(|x| x.extract())
        .map(|(_, [_, name, _])| name.to_string())
        .collect()
}
