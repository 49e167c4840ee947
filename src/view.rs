//! View cache (spec §4.10 "draw order")
//!
//! Isometric rendering draws back-to-front by tile row. This resource
//! buckets every drawable entity (characters, objects, magic sprites) by
//! row once per tick so a host renderer doesn't have to re-sort the whole
//! world every frame. The core itself never draws anything — this is
//! purely the precomputed index external renderers consult.

use std::collections::BTreeMap;

use bevy::prelude::*;

use crate::character::Character;
use crate::magic::MagicSprite;
use crate::object::Obj;

#[derive(Resource, Default)]
pub struct ViewCache {
    rows: BTreeMap<i32, Vec<Entity>>,
}

impl ViewCache {
    pub fn rebuild(
        &mut self,
        characters: &Query<(Entity, &Character)>,
        objs: &Query<(Entity, &Obj)>,
        magic: &Query<(Entity, &MagicSprite)>,
    ) {
        self.rows.clear();
        for (e, c) in characters.iter() {
            if c.is_visible {
                self.rows.entry(c.sprite.tile_pos.y).or_default().push(e);
            }
        }
        for (e, o) in objs.iter() {
            if !o.is_removed {
                self.rows.entry(o.tile_pos.y).or_default().push(e);
            }
        }
        for (e, m) in magic.iter() {
            self.rows.entry(m.tile().y).or_default().push(e);
        }
    }

    /// Rows in ascending order, back-to-front draw order for this grid.
    pub fn rows_in_draw_order(&self) -> impl Iterator<Item = (&i32, &Vec<Entity>)> {
        self.rows.iter()
    }

    pub fn entities_on_row(&self, row: i32) -> &[Entity] {
        self.rows.get(&row).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
