//! Interactive audibility viewer - mouse moves the sound source in real time

use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use audibility_grid::render::{cell_rgb, normalize_levels};
use audibility_grid::{
    AudibilityConfig, AudibilityEngine, AudibleSound, Connectivity, GridCoord, GridId, GridInfo,
    LoudnessLevel, MaterialLayer, MufflingChange, Normalization, WorldPoint,
};

const GRID: GridId = GridId(0);

/// Interactive viewer for testing propagation against hand-drawn walls
pub struct InteractiveViewer {
    config: AudibilityConfig,
    engine: AudibilityEngine,
    info: GridInfo,
    layer: MaterialLayer<LoudnessLevel>,
    walls: Vec<bool>,
    /// Cell toggled by the current mouse press, so dragging does not flicker
    last_wall: Option<(usize, usize)>,
    window: Window,
    buffer: Vec<u32>,
}

impl InteractiveViewer {
    /// Create a new interactive viewer with the given configuration
    pub fn new(config: AudibilityConfig) -> Result<Self, String> {
        let viewer = &config.viewer;
        let (grid_w, grid_h) = (viewer.grid_width, viewer.grid_height);
        let window_w = grid_w * viewer.scale;
        let window_h = grid_h * viewer.scale;

        let window = Window::new(
            "Audibility - Interactive Viewer (ESC to exit)",
            window_w,
            window_h,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| e.to_string())?;

        let info = GridInfo::flat((0, 0), (grid_w, grid_h), (0.0, 0.0), (1.0, 1.0))
            .map_err(|e| e.to_string())?;
        let mut engine = AudibilityEngine::new(config.propagation.clone());
        engine.register_grid(GRID, info);

        Ok(Self {
            engine,
            info,
            layer: MaterialLayer::new(info),
            walls: vec![false; info.cell_count()],
            last_wall: None,
            window,
            buffer: vec![0u32; window_w * window_h],
            config,
        })
    }

    /// Run the interactive viewer loop
    pub fn run(&mut self) -> Result<(), String> {
        let (grid_w, grid_h) = (self.config.viewer.grid_width, self.config.viewer.grid_height);
        let scale = self.config.viewer.scale;

        // Limit to ~60fps
        self.window.set_target_fps(60);

        println!("=== Interactive Audibility Viewer ===");
        println!("Controls:");
        println!("  Mouse      - Move sound source");
        println!("  Left Click - Toggle wall");
        println!("  C          - Clear walls");
        println!("  4/8        - Connectivity: four/eight neighbors");
        println!("  1/2        - Normalization: absolute/relative");
        println!("  +/-        - Adjust source loudness");
        println!("  ESC        - Exit");
        println!();

        while self.window.is_open() && !self.window.is_key_down(Key::Escape) {
            self.handle_keys();

            if let Some((mx, my)) = self.window.get_mouse_pos(MouseMode::Discard) {
                let grid_x = (mx as usize / scale).min(grid_w - 1);
                // Screen rows grow downward, grid y grows north
                let grid_y = grid_h - 1 - (my as usize / scale).min(grid_h - 1);

                if self.window.get_mouse_down(MouseButton::Left) {
                    if self.last_wall != Some((grid_x, grid_y)) {
                        self.toggle_wall(grid_x, grid_y);
                        self.last_wall = Some((grid_x, grid_y));
                    }
                } else {
                    self.last_wall = None;
                }

                self.render_audibility(grid_x, grid_y)?;
            }

            self.window
                .update_with_buffer(&self.buffer, grid_w * scale, grid_h * scale)
                .map_err(|e| e.to_string())?;
        }

        Ok(())
    }

    fn handle_keys(&mut self) {
        let mut propagation = self.engine.config().clone();
        if self.window.is_key_pressed(Key::Key4, KeyRepeat::No) {
            propagation.connectivity = Connectivity::Four;
            println!("Connectivity: four");
        }
        if self.window.is_key_pressed(Key::Key8, KeyRepeat::No) {
            propagation.connectivity = Connectivity::Eight;
            println!("Connectivity: eight");
        }
        if propagation != *self.engine.config() {
            self.engine.set_config(propagation);
        }

        if self.window.is_key_pressed(Key::Key1, KeyRepeat::No) {
            self.config.viewer.normalization = Normalization::Absolute;
            println!("Normalization: absolute");
        }
        if self.window.is_key_pressed(Key::Key2, KeyRepeat::No) {
            self.config.viewer.normalization = Normalization::Relative;
            println!("Normalization: relative");
        }

        let viewer = &mut self.config.viewer;
        if self.window.is_key_pressed(Key::Equal, KeyRepeat::Yes)
            || self.window.is_key_pressed(Key::NumPadPlus, KeyRepeat::Yes)
        {
            viewer.source_loudness = (viewer.source_loudness + 5).min(160);
            println!("Loudness: {}", viewer.source_loudness);
        }
        if self.window.is_key_pressed(Key::Minus, KeyRepeat::Yes)
            || self.window.is_key_pressed(Key::NumPadMinus, KeyRepeat::Yes)
        {
            viewer.source_loudness = (viewer.source_loudness - 5).max(0);
            println!("Loudness: {}", viewer.source_loudness);
        }

        if self.window.is_key_pressed(Key::C, KeyRepeat::No) {
            self.clear_walls();
            println!("Walls cleared");
        }
    }

    /// Toggle wall at grid position; only that cell's muffling is refreshed
    fn toggle_wall(&mut self, x: usize, y: usize) {
        let coord = GridCoord::flat(x as i32, y as i32);
        let Some(slot) = self.info.to_index_absolute(coord).slot() else {
            return;
        };
        self.walls[slot] = !self.walls[slot];
        let material = self.walls[slot].then(|| LoudnessLevel::new(self.config.viewer.wall_muffling));
        self.layer.set(coord, material);
        self.engine.notify(MufflingChange::Cell(GRID, coord));
    }

    /// Clear all walls; the whole grid is rebuilt on the next tick
    fn clear_walls(&mut self) {
        self.layer.clear();
        self.walls.iter_mut().for_each(|w| *w = false);
        self.engine.notify(MufflingChange::Grid(GRID));
    }

    fn render_audibility(&mut self, source_x: usize, source_y: usize) -> Result<(), String> {
        let viewer = &self.config.viewer;
        let source = AudibleSound::new(
            WorldPoint::flat(source_x as f32, source_y as f32),
            LoudnessLevel::new(viewer.source_loudness),
            viewer.source_range,
        );
        let report = self
            .engine
            .tick(GRID, &[source], &self.layer)
            .map_err(|e| e.to_string())?;
        if !report.is_settled() {
            log::warn!("tick did not settle: {:?}", report.convergence);
        }

        let cells = self.engine.settled(GRID).map_err(|e| e.to_string())?;
        let brightness = normalize_levels(cells, viewer.normalization);
        let (grid_w, grid_h) = (viewer.grid_width, viewer.grid_height);
        let scale = viewer.scale;

        for gx in 0..grid_w {
            for gy in 0..grid_h {
                let Some(slot) = self.info.to_index_relative(GridCoord::flat(gx as i32, gy as i32)).slot() else {
                    continue;
                };
                let color = cell_rgb(brightness[slot], self.walls[slot]);

                // Fill scaled pixels, north row at the top
                let row = grid_h - 1 - gy;
                for sy in 0..scale {
                    for sx in 0..scale {
                        let px = gx * scale + sx;
                        let py = row * scale + sy;
                        self.buffer[py * (grid_w * scale) + px] = color;
                    }
                }
            }
        }
        Ok(())
    }
}
