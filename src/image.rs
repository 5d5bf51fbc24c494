//! Image arrays
//!
//! Dense row-major arrays of u8 samples, either 2-D `(height, width)` or
//! 3-D `(height, width, channels)`. A 2-D image has one channel.

use crate::error::{IidbError, Result};

/// A contiguous row-major u8 image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    data: Vec<u8>,
    height: usize,
    width: usize,
    /// `None` for 2-D images
    channels: Option<usize>,
}

impl Image {
    /// Build a 2-D image; `data.len()` must equal `height * width`
    pub fn new_2d(height: usize, width: usize, data: Vec<u8>) -> Result<Self> {
        check_len(&[height, width], data.len())?;
        Ok(Self {
            data,
            height,
            width,
            channels: None,
        })
    }

    /// Build a 3-D image; `data.len()` must equal `height * width * channels`
    pub fn new_3d(height: usize, width: usize, channels: usize, data: Vec<u8>) -> Result<Self> {
        if channels == 0 {
            return Err(IidbError::InvalidImage(
                "channel dimension must be at least 1".to_string(),
            ));
        }
        check_len(&[height, width, channels], data.len())?;
        Ok(Self {
            data,
            height,
            width,
            channels: Some(channels),
        })
    }

    /// Build from a shape slice of rank 2 or 3
    pub fn from_shape(shape: &[usize], data: Vec<u8>) -> Result<Self> {
        match *shape {
            [h, w] => Self::new_2d(h, w, data),
            [h, w, c] => Self::new_3d(h, w, c, data),
            _ => Err(IidbError::InvalidImage(format!(
                "expected 2 or 3 dimensions, got {}",
                shape.len()
            ))),
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Channel count, 1 for 2-D images
    pub fn channels(&self) -> usize {
        self.channels.unwrap_or(1)
    }

    /// Number of dimensions (2 or 3)
    pub fn ndim(&self) -> usize {
        if self.channels.is_some() {
            3
        } else {
            2
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self.channels {
            Some(c) => vec![self.height, self.width, c],
            None => vec![self.height, self.width],
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Sample at `(row, col, channel)`, `None` when out of bounds
    pub fn pixel(&self, row: usize, col: usize, channel: usize) -> Option<u8> {
        let channels = self.channels();
        if row >= self.height || col >= self.width || channel >= channels {
            return None;
        }
        self.data
            .get((row * self.width + col) * channels + channel)
            .copied()
    }
}

/// A batch of equally-shaped images in one contiguous buffer
///
/// Layout is `(len, height, width)` or `(len, height, width, channels)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageStack {
    data: Vec<u8>,
    len: usize,
    height: usize,
    width: usize,
    channels: Option<usize>,
}

impl ImageStack {
    pub(crate) fn new(
        data: Vec<u8>,
        len: usize,
        height: usize,
        width: usize,
        channels: Option<usize>,
    ) -> Self {
        Self {
            data,
            len,
            height,
            width,
            channels,
        }
    }

    pub(crate) fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, 0, None)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn shape(&self) -> Vec<usize> {
        match self.channels {
            Some(c) => vec![self.len, self.height, self.width, c],
            None => vec![self.len, self.height, self.width],
        }
    }

    /// Bytes of a single image in the stack
    pub fn image_len(&self) -> usize {
        self.height * self.width * self.channels.unwrap_or(1)
    }

    /// Borrow the samples of image `index`
    pub fn get(&self, index: usize) -> Option<&[u8]> {
        if index >= self.len {
            return None;
        }
        let size = self.image_len();
        self.data.get(index * size..(index + 1) * size)
    }

    /// Copy image `index` out as a standalone `Image`
    pub fn image(&self, index: usize) -> Option<Image> {
        let bytes = self.get(index)?.to_vec();
        Some(Image {
            data: bytes,
            height: self.height,
            width: self.width,
            channels: self.channels,
        })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

fn check_len(dims: &[usize], actual: usize) -> Result<()> {
    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| IidbError::InvalidImage(format!("shape {:?} overflows usize", dims)))?;

    if expected != actual {
        return Err(IidbError::InvalidImage(format!(
            "shape {:?} needs {} bytes, got {}",
            dims, expected, actual
        )));
    }
    Ok(())
}
