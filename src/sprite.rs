//! Sprite base (spec §2 "Sprite base", §3)
//!
//! Position, facing, current frame, interval timing, and per-state
//! animation playback shared by characters, objects, and magic sprites.

use crate::geometry::{tile_to_pixel, Direction8, PixelPos, TilePos};

/// Position + facing + animation-frame cursor shared by every drawable
/// simulation entity.
#[derive(Debug, Clone, Copy)]
pub struct SpriteState {
    pub tile_pos: TilePos,
    pub pixel_pos: PixelPos,
    pub facing: Direction8,
    pub frame: u32,
    pub elapsed_ms: f32,
}

impl SpriteState {
    pub fn new(tile_pos: TilePos, facing: Direction8) -> Self {
        Self {
            tile_pos,
            pixel_pos: tile_to_pixel(tile_pos),
            facing,
            frame: 0,
            elapsed_ms: 0.0,
        }
    }

    /// Move to a new tile, recomputing the pixel position from it.
    pub fn set_tile(&mut self, tile: TilePos) {
        self.tile_pos = tile;
        self.pixel_pos = tile_to_pixel(tile);
    }

    pub fn reset_animation(&mut self) {
        self.frame = 0;
        self.elapsed_ms = 0.0;
    }

    /// Advance the frame cursor by `dt_ms` at `interval_ms` per frame,
    /// wrapping within `frames_per_direction`. Returns `true` once the
    /// cursor completes a full cycle (frame wrapped back to 0) — used to
    /// fire one-shot animation callbacks (Attack/Magic/Hurt/Death).
    pub fn advance(&mut self, dt_ms: f32, interval_ms: f32, frames_per_direction: u32) -> bool {
        if interval_ms <= 0.0 || frames_per_direction == 0 {
            return false;
        }
        self.elapsed_ms += dt_ms;
        let mut completed = false;
        while self.elapsed_ms >= interval_ms {
            self.elapsed_ms -= interval_ms;
            self.frame += 1;
            if self.frame >= frames_per_direction {
                self.frame = 0;
                completed = true;
            }
        }
        completed
    }
}
