//! Letterboxing and tensor layout of frames.

use fast_image_resize::{
    images::{CroppedImageMut, Image as FirImage},
    pixels::PixelType,
    FilterType, ResizeAlg, ResizeOptions, Resizer,
};
use image::RgbImage;

use crate::common::ChannelOrder;
use crate::detection_runners::input_wrapper::X;
use crate::error::{DetectError, Result};

pub const DEFAULT_PAD_VALUE: u8 = 114;

/// Mapping between an original frame and its letterboxed copy. Only valid
/// for the frame it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxParams {
    pub scale: f32,
    pub pad_left: u32,
    pub pad_top: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

impl LetterboxParams {
    pub fn new(src_w: u32, src_h: u32, target_w: u32, target_h: u32) -> Self {
        let scale = (target_w as f32 / src_w as f32).min(target_h as f32 / src_h as f32);
        let (new_w, new_h) = scaled_size(src_w, src_h, scale, target_w, target_h);
        Self {
            scale,
            pad_left: (target_w - new_w) / 2,
            pad_top: (target_h - new_h) / 2,
            orig_width: src_w,
            orig_height: src_h,
        }
    }

    /// Size of the resized content inside the padded canvas.
    pub fn content_size(&self, target_w: u32, target_h: u32) -> (u32, u32) {
        scaled_size(self.orig_width, self.orig_height, self.scale, target_w, target_h)
    }

    pub fn to_letterboxed(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.scale + self.pad_left as f32,
            y * self.scale + self.pad_top as f32,
        )
    }

    pub fn to_original(&self, x: f32, y: f32) -> (f32, f32) {
        (
            (x - self.pad_left as f32) / self.scale,
            (y - self.pad_top as f32) / self.scale,
        )
    }
}

fn scaled_size(src_w: u32, src_h: u32, scale: f32, target_w: u32, target_h: u32) -> (u32, u32) {
    let new_w = (src_w as f32 * scale).round() as u32;
    let new_h = (src_h as f32 * scale).round() as u32;
    (new_w.clamp(1, target_w), new_h.clamp(1, target_h))
}

/// Scales `img` to fit `target_w` x `target_h` keeping its aspect ratio and
/// pads the remainder with `pad_value`. Odd padding leaves the extra pixel on
/// the bottom/right. Channel order is preserved.
pub fn letterbox(
    img: &RgbImage,
    target_w: u32,
    target_h: u32,
    pad_value: u8,
) -> Result<(RgbImage, LetterboxParams)> {
    let (w0, h0) = img.dimensions();
    if w0 == 0 || h0 == 0 {
        return Err(DetectError::EmptyFrame);
    }
    if target_w == 0 || target_h == 0 {
        return Err(DetectError::InvalidConfig(format!(
            "letterbox target {target_w}x{target_h} is empty"
        )));
    }

    let params = LetterboxParams::new(w0, h0, target_w, target_h);
    let (new_w, new_h) = params.content_size(target_w, target_h);

    let src = FirImage::from_vec_u8(w0, h0, img.as_raw().clone(), PixelType::U8x3)
        .map_err(preprocess_err)?;
    let mut padded = FirImage::from_vec_u8(
        target_w,
        target_h,
        vec![pad_value; (target_w * target_h * 3) as usize],
        PixelType::U8x3,
    )
    .map_err(preprocess_err)?;

    let mut cropped = CroppedImageMut::new(&mut padded, params.pad_left, params.pad_top, new_w, new_h)
        .map_err(preprocess_err)?;
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src, &mut cropped, &options)
        .map_err(preprocess_err)?;

    let out = RgbImage::from_raw(target_w, target_h, padded.into_vec()).ok_or_else(|| {
        DetectError::Preprocess("letterboxed buffer does not match its dimensions".to_string())
    })?;
    Ok((out, params))
}

/// Packs an interleaved 8-bit image into a `[1, 3, H, W]` tensor scaled to
/// `[0, 1]`, channels in RGB order.
pub fn to_nchw(img: &RgbImage, order: ChannelOrder) -> Result<X> {
    let (w, h) = (img.width() as usize, img.height() as usize);
    if w == 0 || h == 0 {
        return Err(DetectError::EmptyFrame);
    }
    let buf = img.as_raw();
    let hw = w * h;
    let (r, b) = match order {
        ChannelOrder::Rgb => (0, 2),
        ChannelOrder::Bgr => (2, 0),
    };

    let mut out = vec![0.0f32; 3 * hw];
    for (i, px) in buf.chunks_exact(3).enumerate() {
        out[i] = px[r] as f32 / 255.0;
        out[i + hw] = px[1] as f32 / 255.0;
        out[i + 2 * hw] = px[b] as f32 / 255.0;
    }

    X::from_shape_vec(&[1, 3, h, w], out)
}

fn preprocess_err(err: impl std::fmt::Display) -> DetectError {
    DetectError::Preprocess(err.to_string())
}
