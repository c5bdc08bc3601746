//! Frame → classifier tensor.
//!
//! [`Preprocessor::prepare`] is deterministic: convert to RGB, resize to the
//! model input size with a Catmull-Rom filter, scale to `[0, 1]` and add a
//! leading batch axis (NHWC, `[1, H, W, 3]`).

use std::path::Path;

use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::domain::FrameError;

/// Default classifier input edge, in pixels.
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Channel order of 3- and 4-channel frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelOrder {
    #[default]
    Rgb,
    /// Camera-native order (OpenCV style); swapped to RGB before resize.
    Bgr,
}

/// Raw captured image, interleaved 8-bit samples, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// 1 (gray), 3 (RGB/BGR) or 4 (RGBA/BGRA).
    pub channels: u8,
    pub order: PixelOrder,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, order: PixelOrder, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            channels,
            order,
            data,
        }
    }

    /// Decode an encoded still (PNG or JPEG) into an RGB frame.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| FrameError::Decode(e.to_string()))?
            .to_rgb8();
        let (width, height) = img.dimensions();
        Ok(Self::new(width, height, 3, PixelOrder::Rgb, img.into_raw()))
    }

    /// Read and decode an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FrameError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(|e| FrameError::Decode(format!("{}: {e}", path.display())))?;
        Self::decode(&bytes)
    }

    /// Check extent, channel count and buffer length.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.width == 0 || self.height == 0 {
            return Err(FrameError::EmptyFrame {
                width: self.width,
                height: self.height,
            });
        }
        if !matches!(self.channels, 1 | 3 | 4) {
            return Err(FrameError::UnsupportedChannels {
                channels: self.channels,
            });
        }
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        if self.data.len() != expected {
            return Err(FrameError::BufferSize {
                width: self.width,
                height: self.height,
                channels: self.channels,
                expected,
                actual: self.data.len(),
            });
        }
        Ok(())
    }

    fn to_rgb(&self) -> Result<RgbImage, FrameError> {
        self.validate()?;

        let pixels = self.width as usize * self.height as usize;
        let mut rgb = Vec::with_capacity(pixels * 3);
        match self.channels {
            1 => {
                for &v in &self.data {
                    rgb.extend_from_slice(&[v, v, v]);
                }
            }
            n => {
                for px in self.data.chunks_exact(n as usize) {
                    match self.order {
                        PixelOrder::Rgb => rgb.extend_from_slice(&px[..3]),
                        PixelOrder::Bgr => rgb.extend_from_slice(&[px[2], px[1], px[0]]),
                    }
                }
            }
        }

        RgbImage::from_raw(self.width, self.height, rgb).ok_or(FrameError::BufferSize {
            width: self.width,
            height: self.height,
            channels: 3,
            expected: pixels * 3,
            actual: 0,
        })
    }
}

/// Batched NHWC float tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: [usize; 4],
    data: Vec<f32>,
}

impl Tensor {
    pub fn shape(&self) -> [usize; 4] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Nested `[H][W][C]` rows of the single batch item.
    pub fn rows(&self) -> Vec<Vec<Vec<f32>>> {
        let [_, h, w, c] = self.shape;
        self.data
            .chunks_exact(w * c)
            .take(h)
            .map(|row| row.chunks_exact(c).map(|px| px.to_vec()).collect())
            .collect()
    }
}

/// Frame preprocessing for a fixed square model input.
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    input_size: u32,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(DEFAULT_INPUT_SIZE)
    }
}

impl Preprocessor {
    pub fn new(input_size: u32) -> Self {
        Self { input_size }
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }

    /// Tensor shape this preprocessor produces.
    pub fn input_shape(&self) -> [usize; 4] {
        let s = self.input_size as usize;
        [1, s, s, 3]
    }

    pub fn prepare(&self, frame: &Frame) -> Result<Tensor, FrameError> {
        let rgb = frame.to_rgb()?;
        let resized = if rgb.dimensions() == (self.input_size, self.input_size) {
            rgb
        } else {
            imageops::resize(&rgb, self.input_size, self.input_size, FilterType::CatmullRom)
        };

        let data = resized
            .into_raw()
            .into_iter()
            .map(|v| f32::from(v) / 255.0)
            .collect();

        Ok(Tensor {
            shape: self.input_shape(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(width: u32, height: u32, px: [u8; 3], order: PixelOrder) -> Frame {
        let data = px.repeat((width * height) as usize);
        Frame::new(width, height, 3, order, data)
    }

    #[test]
    fn test_prepare_shape_and_range() {
        let frame = solid(640, 480, [10, 128, 255], PixelOrder::Rgb);
        let tensor = Preprocessor::default().prepare(&frame).unwrap();
        assert_eq!(tensor.shape(), [1, 224, 224, 3]);
        assert_eq!(tensor.data().len(), 224 * 224 * 3);
        assert!(tensor.data().iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_prepare_scales_by_255() {
        let frame = solid(4, 4, [0, 51, 255], PixelOrder::Rgb);
        let tensor = Preprocessor::new(4).prepare(&frame).unwrap();
        assert_eq!(&tensor.data()[..3], &[0.0, 0.2, 1.0]);
    }

    #[test]
    fn test_bgr_is_swapped_to_rgb() {
        let frame = solid(2, 2, [255, 0, 0], PixelOrder::Bgr);
        let tensor = Preprocessor::new(2).prepare(&frame).unwrap();
        assert_eq!(&tensor.data()[..3], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_gray_and_rgba_frames_supported() {
        let gray = Frame::new(2, 2, 1, PixelOrder::Rgb, vec![51; 4]);
        let tensor = Preprocessor::new(2).prepare(&gray).unwrap();
        assert_eq!(&tensor.data()[..3], &[0.2, 0.2, 0.2]);

        let rgba = Frame::new(2, 2, 4, PixelOrder::Rgb, [255, 0, 0, 7].repeat(4));
        let tensor = Preprocessor::new(2).prepare(&rgba).unwrap();
        assert_eq!(&tensor.data()[..3], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_prepare_is_deterministic() {
        let data: Vec<u8> = (0..300 * 200 * 3).map(|i| (i % 251) as u8).collect();
        let frame = Frame::new(300, 200, 3, PixelOrder::Bgr, data);
        let pre = Preprocessor::default();
        assert_eq!(pre.prepare(&frame).unwrap(), pre.prepare(&frame).unwrap());
    }

    #[test]
    fn test_zero_extent_rejected() {
        let frame = Frame::new(0, 10, 3, PixelOrder::Rgb, vec![]);
        assert!(matches!(
            Preprocessor::default().prepare(&frame),
            Err(FrameError::EmptyFrame { .. })
        ));
    }

    #[test]
    fn test_unsupported_channels_rejected() {
        let frame = Frame::new(2, 2, 2, PixelOrder::Rgb, vec![0; 8]);
        assert!(matches!(
            Preprocessor::default().prepare(&frame),
            Err(FrameError::UnsupportedChannels { channels: 2 })
        ));
    }

    #[test]
    fn test_buffer_size_mismatch_rejected() {
        let frame = Frame::new(4, 4, 3, PixelOrder::Rgb, vec![0; 47]);
        match Preprocessor::default().prepare(&frame) {
            Err(FrameError::BufferSize {
                expected, actual, ..
            }) => {
                assert_eq!(expected, 48);
                assert_eq!(actual, 47);
            }
            other => panic!("expected BufferSize, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            Frame::decode(b"not an image"),
            Err(FrameError::Decode(_))
        ));
    }

    #[test]
    fn test_decode_png_round_trip() {
        let img = RgbImage::from_pixel(3, 2, image::Rgb([1, 2, 3]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();

        let frame = Frame::decode(bytes.get_ref()).unwrap();
        assert_eq!((frame.width, frame.height, frame.channels), (3, 2, 3));
        assert_eq!(&frame.data[..3], &[1, 2, 3]);
    }

    #[test]
    fn test_tensor_rows_shape() {
        let frame = solid(3, 3, [0, 0, 0], PixelOrder::Rgb);
        let tensor = Preprocessor::new(3).prepare(&frame).unwrap();
        let rows = tensor.rows();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].len(), 3);
        assert_eq!(rows[0][0].len(), 3);
    }
}
