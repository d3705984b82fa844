mod accelerator;
mod bbox;
mod detection;
mod frame;
mod frame_source;
mod inference_device;
mod model_config;
mod output_layout;
mod tensor_spec;

pub use accelerator::*;
pub use bbox::*;
pub use detection::*;
pub use frame::*;
pub use frame_source::*;
pub use inference_device::*;
pub use model_config::*;
pub use output_layout::*;
pub use tensor_spec::*;
