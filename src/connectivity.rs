use log::debug;
use std::collections::{HashSet, VecDeque};

use crate::error::{alloc_buffer, Error, Result};

const DX4: [i64; 4] = [-1, 0, 1, 0];
const DY4: [i64; 4] = [0, -1, 0, 1];

/// Relabels `labels` so every label is one 4-connected component, folding
/// components of at most `(W*H/k) / 4` pixels into an adjacent label.
///
/// Only the first large component of each input label opens a new label; later
/// fragments of the same input label are folded like small ones, and pixels still
/// carrying a negative label never open one. The output therefore has at most as
/// many labels as the input has distinct non-negative labels (and at least one).
///
/// Returns the new label map and the number of labels in it.
pub fn enforce_connectivity(
    labels: &[i32],
    width: usize,
    height: usize,
    k: usize,
) -> Result<(Vec<i32>, usize)> {
    let sz = width * height;
    if labels.len() != sz {
        return Err(Error::InvalidArgument(format!(
            "label map has {} entries, expected {}x{}",
            labels.len(),
            width,
            height
        )));
    }
    let supsz = sz / k.max(1);
    let min_size = supsz >> 2;

    let mut relabeled = alloc_buffer(sz, -1i32)?;
    let mut queue = VecDeque::<usize>::new();
    let mut members = Vec::<usize>::new();
    let mut label = 0i32;
    let mut adj_label = 0i32;
    let mut folded = 0usize;
    let mut opened = HashSet::<i32>::new();

    for start in 0..sz {
        if relabeled[start] >= 0 {
            continue;
        }
        let (sx, sy) = ((start % width) as i64, (start / width) as i64);
        for n in 0..4 {
            let (x, y) = (sx + DX4[n], sy + DY4[n]);
            if x >= 0 && x < width as i64 && y >= 0 && y < height as i64 {
                let nindex = y as usize * width + x as usize;
                if relabeled[nindex] >= 0 {
                    adj_label = relabeled[nindex];
                }
            }
        }

        let original = labels[start];
        members.clear();
        relabeled[start] = label;
        queue.push_back(start);
        while let Some(idx) = queue.pop_front() {
            members.push(idx);
            let (cx, cy) = ((idx % width) as i64, (idx / width) as i64);
            for n in 0..4 {
                let (x, y) = (cx + DX4[n], cy + DY4[n]);
                if x >= 0 && x < width as i64 && y >= 0 && y < height as i64 {
                    let nindex = y as usize * width + x as usize;
                    if relabeled[nindex] < 0 && labels[nindex] == original {
                        relabeled[nindex] = label;
                        queue.push_back(nindex);
                    }
                }
            }
        }

        if members.len() <= min_size || original < 0 || !opened.insert(original) {
            for &idx in &members {
                relabeled[idx] = adj_label;
            }
            folded += 1;
        } else {
            label += 1;
        }
    }

    // Zero only when every component was folded: they all carry label 0.
    let num_labels = if sz > 0 { (label as usize).max(1) } else { 0 };
    debug!("connectivity: {} labels, {} components folded (min size {})", num_labels, folded, min_size);
    Ok((relabeled, num_labels))
}
