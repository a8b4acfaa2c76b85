use image::{GrayImage, Luma, Rgb, RgbImage};
use palette::{encoding, FromColor, Hsv, Srgb};

use crate::error::{Error, Result};
use crate::features::RegionRecord;

const BOUNDARY_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

fn check_len(len: usize, width: u32, height: u32) -> Result<()> {
    if len != width as usize * height as usize {
        return Err(Error::InvalidArgument(format!("map has {} values, expected {}x{}", len, width, height)));
    }
    Ok(())
}

/// Paints white every pixel whose 8-neighborhood holds more than one pixel of a
/// different label.
pub fn draw_contours(image: &mut RgbImage, labels: &[i32]) -> Result<()> {
    const DX8: [i64; 8] = [-1, -1, 0, 1, 1, 1, 0, -1];
    const DY8: [i64; 8] = [0, -1, -1, -1, 0, 1, 1, 1];
    let (w, h) = image.dimensions();
    check_len(labels.len(), w, h)?;
    let (wi, hi) = (w as i64, h as i64);

    let mut boundary = Vec::new();
    for y in 0..hi {
        for x in 0..wi {
            let label = labels[(y * wi + x) as usize];
            let differing = (0..8usize)
                .filter(|&n| {
                    let (nx, ny) = (x + DX8[n], y + DY8[n]);
                    nx >= 0 && nx < wi && ny >= 0 && ny < hi && labels[(ny * wi + nx) as usize] != label
                })
                .count();
            if differing > 1 {
                boundary.push((x as u32, y as u32));
            }
        }
    }
    for (x, y) in boundary {
        image.put_pixel(x, y, BOUNDARY_COLOR);
    }
    Ok(())
}

/// Fully saturated color for a cluster id; consecutive ids are spread around the hue circle.
pub fn cluster_color(cluster: usize) -> Rgb<u8> {
    let hue = (cluster as f32 * 137.507_77) % 360.0;
    let hsv: Hsv<encoding::Srgb, f32> = Hsv::new(hue, 1.0, 1.0);
    let rgb: Srgb<f32> = Srgb::from_color(hsv);
    let to_u8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
    Rgb([to_u8(rgb.red), to_u8(rgb.green), to_u8(rgb.blue)])
}

/// Fills coherent regions with their cluster color; everything else keeps the source pixel.
pub fn render_clusters(source: &RgbImage, labels: &[i32], regions: &[RegionRecord]) -> Result<RgbImage> {
    let (w, h) = source.dimensions();
    check_len(labels.len(), w, h)?;
    let mut out = source.clone();
    for (index, (&label, px)) in labels.iter().zip(out.pixels_mut()).enumerate() {
        let region = usize::try_from(label)
            .ok()
            .and_then(|l| regions.get(l))
            .ok_or(Error::LabelOutOfRange { index, label, num_labels: regions.len() })?;
        if let (true, Some(cluster)) = (region.coherent, region.cluster) {
            *px = cluster_color(cluster);
        }
    }
    Ok(out)
}

/// Scales a [0, 1] map to an 8-bit grayscale image.
pub fn map_to_gray(values: &[f32], width: u32, height: u32) -> Result<GrayImage> {
    check_len(values.len(), width, height)?;
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let v = values[(y * width + x) as usize];
        Luma([(v.clamp(0.0, 1.0) * 255.0).round() as u8])
    }))
}
