//! Label files and CSV tables.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::clustering::ClusterTable;
use crate::error::{alloc_buffer, check_dimensions, Result};
use crate::features::RegionRecord;

/// Writes labels as headerless little-endian `i32`s in raster order.
pub fn write_labels<W: Write>(mut writer: W, labels: &[i32]) -> Result<()> {
    for label in labels {
        writer.write_all(&label.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Reads exactly `width * height` labels written by [`write_labels`].
pub fn read_labels<R: Read>(mut reader: R, width: usize, height: usize) -> Result<Vec<i32>> {
    let sz = check_dimensions(width, height)?;
    let mut labels = alloc_buffer(sz, 0i32)?;
    let mut buf = [0u8; 4];
    for label in labels.iter_mut() {
        reader.read_exact(&mut buf)?;
        *label = i32::from_le_bytes(buf);
    }
    Ok(labels)
}

pub fn save_labels<P: AsRef<Path>>(path: P, labels: &[i32]) -> Result<()> {
    write_labels(BufWriter::new(File::create(path)?), labels)
}

pub fn load_labels<P: AsRef<Path>>(path: P, width: usize, height: usize) -> Result<Vec<i32>> {
    read_labels(BufReader::new(File::open(path)?), width, height)
}

pub const REGION_CSV_HEADER: &str =
    "label,size,center_x,center_y,color_r,color_g,color_b,flow_x,flow_y,coherent,cluster";

pub fn write_region_csv<W: Write>(mut writer: W, regions: &[RegionRecord]) -> Result<()> {
    writeln!(writer, "{}", REGION_CSV_HEADER)?;
    for r in regions {
        let cluster = r.cluster.map_or(-1, |c| c as i64);
        writeln!(
            writer,
            "{},{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.4},{:.4},{},{}",
            r.id, r.size, r.center_x, r.center_y, r.color.x, r.color.y, r.color.z, r.flow[0], r.flow[1],
            r.coherent as u8, cluster
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub const CLUSTER_CSV_HEADER: &str = "cluster,members,center_x,center_y,color_r,color_g,color_b";

pub fn write_cluster_csv<W: Write>(mut writer: W, table: &ClusterTable) -> Result<()> {
    writeln!(writer, "{}", CLUSTER_CSV_HEADER)?;
    for c in &table.clusters {
        writeln!(
            writer,
            "{},{},{:.3},{:.3},{:.3},{:.3},{:.3}",
            c.id, c.members, c.center_x, c.center_y, c.color.x, c.color.y, c.color.z
        )?;
    }
    writer.flush()?;
    Ok(())
}
