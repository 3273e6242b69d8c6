//! Texture dimension checks.
//!
//! Basis Universal output for WebGL1 targets needs power-of-two textures.
//! Images that are not get reported and can be scaled down to the nearest
//! power of two on each side before encoding.

use crate::Result;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use std::fmt;
use std::io::Cursor;

/// Width and height of a decoded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Both sides are powers of two.
    pub fn is_power_of_two(&self) -> bool {
        self.width.is_power_of_two() && self.height.is_power_of_two()
    }

    /// Highest power of two not above each side.
    pub fn power_of_two_floor(&self) -> Self {
        Self {
            width: floor_power_of_two(self.width),
            height: floor_power_of_two(self.height),
        }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A texture found with non power-of-two dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NpotTexture {
    pub image: usize,
    pub view: usize,
    pub original: Dimensions,
    /// Size it was scaled to, if resizing was enabled.
    pub resized: Option<Dimensions>,
}

impl fmt::Display for NpotTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = self.original.power_of_two_floor();
        write!(
            f,
            "image {} (BV #{}) - width: {} => {}, height: {} => {}",
            self.image,
            self.view,
            self.original.width,
            target.width,
            self.original.height,
            target.height
        )?;
        if self.resized.is_none() {
            write!(f, " (not resized)")?;
        }
        Ok(())
    }
}

/// Read dimensions from an encoded image without decoding the pixels.
pub fn probe_dimensions(data: &[u8]) -> Result<Dimensions> {
    let (width, height) = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Dimensions::new(width, height))
}

/// Decode `data`, scale it to `target` and re-encode it as PNG.
pub fn resize_to(data: &[u8], target: Dimensions) -> Result<Vec<u8>> {
    let img = image::load_from_memory(data)?;
    let resized = img.resize_exact(target.width, target.height, FilterType::Lanczos3);

    let mut buf = Cursor::new(Vec::new());
    resized.write_to(&mut buf, ImageFormat::Png)?;
    Ok(buf.into_inner())
}

fn floor_power_of_two(n: u32) -> u32 {
    if n == 0 {
        return 1;
    }
    1 << (u32::BITS - 1 - n.leading_zeros())
}
