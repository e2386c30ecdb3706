//! Rendering and normalization for turning settled loudness into images

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{GridCoord, GridInfo};
use crate::loudness::Loudness;
use crate::propagation::CellState;
use crate::query;

/// How loudness maps onto display brightness
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Normalization {
    /// Divide by `LOUDNESS_MAX`; the same level always has the same color
    #[default]
    Absolute,
    /// Divide by the loudest cell of the grid
    Relative,
}

/// Convert a float value (0.0-1.0) to a byte (0-255)
#[inline]
pub fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0) as u8
}

/// Per-cell brightness in `[0, 1]`, in cell-index order
pub fn normalize_levels<L: Loudness>(cells: &[CellState<L>], mode: Normalization) -> Vec<f32> {
    match mode {
        Normalization::Absolute => query::normalized_levels(cells),
        Normalization::Relative => {
            let loudest = query::loudest(cells);
            if loudest <= 0 {
                return vec![0.0; cells.len()];
            }
            let scale = 1.0 / loudest as f32;
            query::average_levels(cells)
                .into_iter()
                .map(|average| average as f32 * scale)
                .collect()
        }
    }
}

/// Heat ramp: black, red, yellow, white
#[inline]
pub fn heat_color(value: f32) -> (u8, u8, u8) {
    let v = value.clamp(0.0, 1.0) * 3.0;
    let r = to_byte(v);
    let g = to_byte(v - 1.0);
    let b = to_byte(v - 2.0);
    (r, g, b)
}

/// Color of one cell as `0x00RRGGBB`, walls shown dark gray
#[inline]
pub fn cell_rgb(brightness: f32, is_wall: bool) -> u32 {
    let (r, g, b) = if is_wall { (64, 64, 64) } else { heat_color(brightness) };
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

/// Write the bottom layer of a grid as a plain PPM image.
///
/// North (+y) is drawn at the top. `walls`, when given, is indexed like the
/// cells and marks cells to paint gray.
pub fn write_ppm<L: Loudness>(
    out: &mut impl Write,
    info: &GridInfo,
    cells: &[CellState<L>],
    walls: Option<&[bool]>,
    mode: Normalization,
    scale: usize,
) -> Result<()> {
    let size = info.size();
    let brightness = normalize_levels(cells, mode);

    let img_width = size.x * scale;
    let img_height = size.y * scale;
    writeln!(out, "P3")?;
    writeln!(out, "{} {}", img_width, img_height)?;
    writeln!(out, "255")?;

    for img_y in 0..img_height {
        let y = size.y - 1 - img_y / scale;
        for img_x in 0..img_width {
            let x = img_x / scale;
            let Some(slot) = info.to_index_relative(GridCoord::flat(x as i32, y as i32)).slot() else {
                continue;
            };
            let is_wall = walls.and_then(|w| w.get(slot)).copied().unwrap_or(false);
            let rgb = cell_rgb(brightness.get(slot).copied().unwrap_or(0.0), is_wall);
            write!(out, "{} {} {} ", rgb >> 16, (rgb >> 8) & 0xff, rgb & 0xff)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// Save a PPM heatmap to `path`
pub fn save_ppm<L: Loudness>(
    path: impl AsRef<Path>,
    info: &GridInfo,
    cells: &[CellState<L>],
    walls: Option<&[bool]>,
    mode: Normalization,
    scale: usize,
) -> Result<()> {
    let mut file = BufWriter::new(File::create(path)?);
    write_ppm(&mut file, info, cells, walls, mode, scale)?;
    file.flush()?;
    Ok(())
}

/// Converts settled averages to a formatted string for debugging, north row first
pub fn levels_to_string<L: Loudness>(info: &GridInfo, cells: &[CellState<L>]) -> String {
    let size = info.size();
    let mut result = String::new();
    for y in (0..size.y).rev() {
        for x in 0..size.x {
            let level = info
                .to_index_relative(GridCoord::flat(x as i32, y as i32))
                .slot()
                .and_then(|slot| cells.get(slot))
                .map_or(0, |cell| cell.current_level.average());
            result.push_str(&format!("{:4}", level));
        }
        result.push('\n');
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Connectivity;
    use crate::loudness::LoudnessLevel;
    use crate::propagation::prepare_cells;

    fn cells() -> (GridInfo, Vec<CellState<LoudnessLevel>>) {
        let info = GridInfo::flat((0, 0), (2, 2), (0.0, 0.0), (1.0, 1.0)).unwrap();
        let mut cells = prepare_cells(&info, Connectivity::Eight);
        cells[0].current_level = LoudnessLevel::new(80);
        cells[1].current_level = LoudnessLevel::new(40);
        (info, cells)
    }

    #[test]
    fn test_normalization_modes() {
        let (_, cells) = cells();
        assert_eq!(normalize_levels(&cells, Normalization::Absolute), vec![0.5, 0.25, 0.0, 0.0]);
        assert_eq!(normalize_levels(&cells, Normalization::Relative), vec![1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_heat_ramp_ends() {
        assert_eq!(heat_color(0.0), (0, 0, 0));
        assert_eq!(heat_color(1.0), (255, 255, 255));
        assert_eq!(cell_rgb(1.0, true), 0x404040);
    }

    #[test]
    fn test_ppm_layout() {
        let (info, cells) = cells();
        let walls = [false, false, false, true];
        let mut out = Vec::new();
        write_ppm(&mut out, &info, &cells, Some(&walls[..]), Normalization::Relative, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(&lines[..3], &["P3", "2 2", "255"]);
        // Top row is y = 1: cell (0,1) then the wall at (1,1)
        assert_eq!(lines[3].trim(), "255 127 0 64 64 64");
        // Bottom row is y = 0: loudest cell then silence
        assert_eq!(lines[4].trim(), "255 255 255 0 0 0");
    }

    #[test]
    fn test_levels_to_string() {
        let (info, cells) = cells();
        assert_eq!(levels_to_string(&info, &cells), "  40   0\n  80   0\n");
    }
}
