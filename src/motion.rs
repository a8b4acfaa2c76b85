use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{alloc_buffer, check_dimensions, Error, Result};

/// Magic number opening a Middlebury `.flo` file.
pub const FLO_MAGIC: f32 = 202021.25;

/// Dense per-pixel displacement field, row-major. `[0.0, 0.0]` means "no reliable
/// motion at this pixel".
#[derive(Clone, Debug, PartialEq)]
pub struct MotionField {
    width: usize,
    height: usize,
    vectors: Vec<[f32; 2]>,
}

impl MotionField {
    /// A field with no motion anywhere.
    pub fn zeros(width: usize, height: usize) -> Result<Self> {
        let sz = check_dimensions(width, height)?;
        Ok(Self { width, height, vectors: alloc_buffer(sz, [0.0; 2])? })
    }

    pub fn from_vectors(width: usize, height: usize, vectors: Vec<[f32; 2]>) -> Result<Self> {
        let sz = check_dimensions(width, height)?;
        if vectors.len() != sz {
            return Err(Error::InvalidArgument(format!(
                "motion field has {} vectors, expected {}x{}",
                vectors.len(),
                width,
                height
            )));
        }
        Ok(Self { width, height, vectors })
    }

    pub fn width(&self) -> usize { self.width }
    pub fn height(&self) -> usize { self.height }
    pub fn vectors(&self) -> &[[f32; 2]] { &self.vectors }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [f32; 2] { self.vectors[y * self.width + x] }

    pub fn set(&mut self, x: usize, y: usize, v: [f32; 2]) { self.vectors[y * self.width + x] = v; }

    /// Fails unless the field covers exactly `width` x `height` pixels.
    pub fn check_matches(&self, width: usize, height: usize) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(Error::DimensionMismatch {
                expected_width: width,
                expected_height: height,
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Reads a Middlebury `.flo` stream.
    pub fn read_flo<R: Read>(mut reader: R) -> Result<Self> {
        let magic = read_f32(&mut reader)?;
        if magic != FLO_MAGIC {
            return Err(Error::Format(format!("bad .flo magic {}", magic)));
        }
        let width = read_i32(&mut reader)?;
        let height = read_i32(&mut reader)?;
        if width <= 0 || height <= 0 {
            return Err(Error::Format(format!("bad .flo dimensions {}x{}", width, height)));
        }
        Self::read_raw(reader, width as usize, height as usize)
    }

    pub fn write_flo<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&FLO_MAGIC.to_le_bytes())?;
        writer.write_all(&(self.width as i32).to_le_bytes())?;
        writer.write_all(&(self.height as i32).to_le_bytes())?;
        self.write_raw(writer)
    }

    /// Reads `width * height` headerless little-endian `f32` (u, v) pairs.
    pub fn read_raw<R: Read>(mut reader: R, width: usize, height: usize) -> Result<Self> {
        let sz = check_dimensions(width, height)?;
        let mut vectors = alloc_buffer(sz, [0.0f32; 2])?;
        for v in vectors.iter_mut() {
            *v = [read_f32(&mut reader)?, read_f32(&mut reader)?];
        }
        Ok(Self { width, height, vectors })
    }

    pub fn write_raw<W: Write>(&self, mut writer: W) -> Result<()> {
        for v in &self.vectors {
            writer.write_all(&v[0].to_le_bytes())?;
            writer.write_all(&v[1].to_le_bytes())?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Loads a field from disk. Files ending in `.flo` carry their own dimensions;
    /// anything else is read as raw pairs sized `width` x `height`.
    pub fn load<P: AsRef<Path>>(path: P, width: usize, height: usize) -> Result<Self> {
        let path = path.as_ref();
        let reader = BufReader::new(File::open(path)?);
        let field = if path.extension().is_some_and(|e| e.eq_ignore_ascii_case("flo")) {
            Self::read_flo(reader)?
        } else {
            Self::read_raw(reader, width, height)?
        };
        field.check_matches(width, height)?;
        Ok(field)
    }

    pub fn save_flo<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.write_flo(BufWriter::new(File::create(path)?))
    }
}

fn read_f32<R: Read>(reader: &mut R) -> Result<f32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

fn read_i32<R: Read>(reader: &mut R) -> Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}
