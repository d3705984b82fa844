mod ort_engine;
pub mod image_ops;
pub mod input_wrapper;
pub mod nms;

pub use image_ops::{letterbox, to_nchw, LetterboxParams, DEFAULT_PAD_VALUE};
pub use nms::{nms, nms_by_class, Nms};
pub use ort_engine::OrtEngine;
