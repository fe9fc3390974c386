//! Image type and format adapter: RGB/BGR conversion, alpha removal, area resize.

use fast_image_resize::images::Image as FirImage;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, Rgb, RgbImage};

/// An 8-bit, three-channel image in B,G,R channel order.
///
/// This is the processing representation: everything that draws on or
/// measures an image works on a `BgrImage`. Display code converts back with
/// [`to_display`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage {
    // Pixel triples are stored as [b, g, r]; the `Rgb` wrapper is only used
    // for its buffer layout.
    buf: RgbImage,
}

impl BgrImage {
    /// A black image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            buf: RgbImage::new(width, height),
        }
    }

    /// Wrap a packed B,G,R buffer of exactly `width * height * 3` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        let actual = data.len();
        if actual != expected {
            return Err(FrameError::InvalidLength { expected, actual });
        }
        RgbImage::from_raw(width, height, data)
            .map(|buf| Self { buf })
            .ok_or(FrameError::InvalidLength { expected, actual })
    }

    pub fn width(&self) -> u32 {
        self.buf.width()
    }

    pub fn height(&self) -> u32 {
        self.buf.height()
    }

    /// Pixel at (x, y) as [b, g, r]. Panics if out of bounds.
    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 3] {
        self.buf.get_pixel(x, y).0
    }

    /// Set the pixel at (x, y) from [b, g, r]. Panics if out of bounds.
    pub fn put_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        self.buf.put_pixel(x, y, Rgb(bgr));
    }

    /// Packed B,G,R bytes, row-major.
    pub fn as_raw(&self) -> &[u8] {
        self.buf.as_raw()
    }

    /// Underlying buffer for drawing. Channel order is B,G,R.
    pub(crate) fn canvas_mut(&mut self) -> &mut RgbImage {
        &mut self.buf
    }
}

/// Convert a decoded image into the processing representation.
///
/// Alpha is discarded and grayscale is expanded to three equal channels
/// before the R,G,B → B,G,R swap.
pub fn to_internal(image: &DynamicImage) -> BgrImage {
    let mut buf = image.to_rgb8();
    for pixel in buf.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    BgrImage { buf }
}

/// Convert a processing image back into R,G,B order for display or encoding.
pub fn to_display(image: &BgrImage) -> RgbImage {
    let mut buf = image.buf.clone();
    for pixel in buf.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    buf
}

/// Downscale to at most `max_width` pixels wide, preserving aspect ratio.
///
/// Images already within the limit are returned unchanged. Otherwise the new
/// height is `floor(height * max_width / width)` (at least 1) and pixels are
/// computed by area averaging.
pub fn resize_to_max_width(image: &BgrImage, max_width: u32) -> Result<BgrImage, FrameError> {
    let (width, height) = (image.width(), image.height());
    if width <= max_width || max_width == 0 {
        return Ok(image.clone());
    }

    let ratio = max_width as f64 / width as f64;
    let new_height = ((height as f64 * ratio).floor() as u32).max(1);

    tracing::debug!(
        from_width = width,
        from_height = height,
        to_width = max_width,
        to_height = new_height,
        "resizing image"
    );

    resize_area(image, max_width, new_height)
}

/// Box-filter convolution: each output pixel averages the source pixels its
/// footprint covers. Channel order does not matter to the filter.
fn resize_area(image: &BgrImage, new_width: u32, new_height: u32) -> Result<BgrImage, FrameError> {
    let src = FirImage::from_vec_u8(image.width(), image.height(), image.as_raw().to_vec(), PixelType::U8x3)?;
    let mut dst = FirImage::new(new_width, new_height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Box));
    Resizer::new().resize(&src, &mut dst, &options)?;

    BgrImage::from_raw(new_width, new_height, dst.into_vec())
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid BGR buffer length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("resize buffer: {0}")]
    Buffer(#[from] fast_image_resize::ImageBufferError),
    #[error("resize failed: {0}")]
    Resize(#[from] fast_image_resize::ResizeError),
}
