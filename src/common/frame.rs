use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{DetectError, Result};

/// Byte order of the three colour channels in a [`Frame`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelOrder {
    /// Camera capture order.
    #[default]
    Bgr,
    Rgb,
}

/// One 8-bit, 3-channel video frame of arbitrary resolution.
///
/// The pixel buffer is stored in an [`RgbImage`] container regardless of
/// channel order; `order` says how to read it.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub image: RgbImage,
    pub order: ChannelOrder,
}

impl std::ops::Deref for Frame {
    type Target = RgbImage;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl From<DynamicImage> for Frame {
    fn from(image: DynamicImage) -> Self {
        Self {
            image: image.to_rgb8(),
            order: ChannelOrder::Rgb,
        }
    }
}

impl From<RgbImage> for Frame {
    fn from(image: RgbImage) -> Self {
        Self {
            image,
            order: ChannelOrder::Rgb,
        }
    }
}

impl Frame {
    pub fn new(image: RgbImage, order: ChannelOrder) -> Self {
        Self { image, order }
    }

    /// Wraps a packed BGR buffer as produced by capture devices.
    pub fn from_bgr(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        let image = RgbImage::from_raw(width, height, data).ok_or_else(|| {
            DetectError::Preprocess(format!(
                "BGR buffer of {actual} bytes does not match {width}x{height} (expected {expected})"
            ))
        })?;
        Ok(Self {
            image,
            order: ChannelOrder::Bgr,
        })
    }

    /// A frame with no pixels. Sources return these for dropped captures.
    pub fn is_empty(&self) -> bool {
        self.image.width() == 0 || self.image.height() == 0
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Copy of the frame with channels in RGB order.
    pub fn to_rgb8(&self) -> RgbImage {
        match self.order {
            ChannelOrder::Rgb => self.image.clone(),
            ChannelOrder::Bgr => {
                let mut rgb = self.image.clone();
                rgb.pixels_mut().for_each(|p| p.0.swap(0, 2));
                rgb
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgr_buffers_must_match_dimensions() {
        assert!(Frame::from_bgr(2, 2, vec![0; 12]).is_ok());
        assert!(matches!(
            Frame::from_bgr(2, 2, vec![0; 11]),
            Err(DetectError::Preprocess(_))
        ));
    }

    #[test]
    fn bgr_frames_swap_to_rgb() {
        let frame = Frame::from_bgr(1, 1, vec![10, 20, 30]).unwrap();
        assert_eq!(frame.to_rgb8().get_pixel(0, 0).0, [30, 20, 10]);
    }

    #[test]
    fn default_frame_is_empty() {
        assert!(Frame::default().is_empty());
        assert!(!Frame::from(RgbImage::new(4, 3)).is_empty());
    }
}
