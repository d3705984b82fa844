use std::path::PathBuf;

use crate::common::Frame;
use crate::error::FrameError;

/// Produces frames on demand. `Err(FrameError::Empty)` means "skip this
/// iteration"; `Err(FrameError::Exhausted)` ends the stream.
pub trait FrameSource {
    fn get_frame(&mut self) -> Result<Frame, FrameError>;

    /// Native resolution, if the source knows it up front.
    fn resolution(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Plays a list of image files as a stream, optionally looping. A looping
/// source that fails to read every file in one full pass is exhausted.
#[derive(Debug)]
pub struct ImageFileSource {
    paths: Vec<PathBuf>,
    cursor: usize,
    looping: bool,
    misses: usize,
}

impl ImageFileSource {
    pub fn new<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
            cursor: 0,
            looping: false,
            misses: 0,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl FrameSource for ImageFileSource {
    fn get_frame(&mut self) -> Result<Frame, FrameError> {
        if self.paths.is_empty() {
            return Err(FrameError::Exhausted);
        }
        if self.misses >= self.paths.len() {
            log::warn!("No readable frame among {} file(s)", self.paths.len());
            return Err(FrameError::Exhausted);
        }
        if self.cursor >= self.paths.len() {
            if !self.looping {
                return Err(FrameError::Exhausted);
            }
            self.cursor = 0;
        }
        let path = &self.paths[self.cursor];
        self.cursor += 1;

        match image::open(path) {
            Ok(image) => {
                self.misses = 0;
                Ok(Frame::from(image))
            }
            Err(err) => {
                self.misses += 1;
                log::warn!("Dropping unreadable frame {}: {err}", path.display());
                Err(FrameError::Empty)
            }
        }
    }
}
