use image::RgbImage;
use palette::white_point::D65;
use palette::{FromColor, Lab, LinSrgb, Srgb};

use crate::error::{alloc_buffer, check_dimensions, Result};

/// Three-channel value used for CIELAB pixels, seed colors and mean RGB colors.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }
    pub fn add(self, o: Self) -> Self { Self { x: self.x + o.x, y: self.y + o.y, z: self.z + o.z } }
    pub fn sub(self, o: Self) -> Self { Self { x: self.x - o.x, y: self.y - o.y, z: self.z - o.z } }
    pub fn scale(self, s: f64) -> Self { Self { x: self.x * s, y: self.y * s, z: self.z * s } }
    pub fn dot(self, o: Self) -> f64 { self.x * o.x + self.y * o.y + self.z * o.z }
    pub fn norm(self) -> f64 { self.dot(self).sqrt() }
    pub fn dist_sq(self, o: Self) -> f64 { let d = self.sub(o); d.dot(d) }
}

/// sRGB (D65) to CIELAB. `x` holds L, `y` holds a, `z` holds b.
#[inline]
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Vec3 {
    let srgb: Srgb<f64> = Srgb::new(r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
    let lin: LinSrgb<f64> = srgb.into_linear();
    let lab: Lab<D65, f64> = Lab::from_color(lin);
    Vec3 { x: lab.l, y: lab.a, z: lab.b }
}

/// Row-major CIELAB copy of an RGB image.
#[derive(Clone, Debug)]
pub struct LabImage {
    width: usize,
    height: usize,
    pixels: Vec<Vec3>,
}

impl LabImage {
    pub fn from_rgb(rgb: &RgbImage) -> Result<Self> {
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        let sz = check_dimensions(width, height)?;
        let mut pixels = alloc_buffer(sz, Vec3::default())?;
        for (x, y, p) in rgb.enumerate_pixels() {
            pixels[y as usize * width + x as usize] = rgb_to_lab(p[0], p[1], p[2]);
        }
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn pixels(&self) -> &[Vec3] { &self.pixels }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Vec3 { self.pixels[y * self.width + x] }

    /// Color-gradient magnitude per pixel. Border pixels are left at zero.
    pub fn detect_edges(&self) -> Result<Vec<f64>> {
        let (w, h) = (self.width, self.height);
        let mut edges = alloc_buffer(w * h, 0.0f64)?;
        if w < 3 || h < 3 {
            return Ok(edges);
        }
        for y in 1..h - 1 {
            for x in 1..w - 1 {
                let i = y * w + x;
                let dx = self.pixels[i - 1].dist_sq(self.pixels[i + 1]);
                let dy = self.pixels[i - w].dist_sq(self.pixels[i + w]);
                edges[i] = dx * dx + dy * dy;
            }
        }
        Ok(edges)
    }
}
