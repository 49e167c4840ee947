//! Spawn formations for each `MoveKind` (spec §4.5).
//!
//! Pure builders: given a cast's static inputs, return the initial spawn
//! spec for every sprite the formation produces. `engine::cast` turns
//! these into live `MagicSprite` components.

use crate::geometry::{self, Direction8, PixelPos, TilePos};
use crate::rng::GameRng;

use super::move_kind;

/// One sprite's initial placement/velocity, before `engine::cast` fills in
/// the shared fields (owner, alignment, magic key, level, ...).
#[derive(Debug, Clone)]
pub struct SpriteSpawn {
    pub pos: PixelPos,
    pub dir32: u8,
    pub delay_ms: f32,
    pub is_static: bool,
    pub speed_scale: f32,
    pub start_vanished: bool,
}

impl SpriteSpawn {
    fn simple(pos: PixelPos, dir32: u8) -> Self {
        SpriteSpawn { pos, dir32, delay_ms: 0.0, is_static: false, speed_scale: 1.0, start_vanished: false }
    }
}

/// `count` used by the symmetric-pair formations (`SectorMove`,
/// `RandomSector`): spec §4.5 item 7, `1 + ⌊(level-1)/3⌋`.
fn pair_count(level: u8) -> i32 {
    1 + (level.saturating_sub(1) as i32) / 3
}

fn dir32_toward(from: TilePos, to: TilePos) -> u8 {
    let from_px = geometry::tile_to_pixel(from);
    let to_px = geometry::tile_to_pixel(to);
    geometry::vector_to_direction32(to_px.x - from_px.x, to_px.y - from_px.y)
}

/// Build the spawn set for `kind` at the given cast `level` (1..10).
/// `origin`/`destination` are caster/target tiles; `region` only matters
/// for `RegionBased`.
pub fn build(
    kind: u8,
    level: u8,
    origin: TilePos,
    destination: TilePos,
    region: crate::assets::RegionShape,
    range_radius: i32,
    rng: &mut GameRng,
) -> Vec<SpriteSpawn> {
    let origin_px = geometry::tile_to_pixel(origin);
    let aim = dir32_toward(origin, destination);

    match kind {
        move_kind::NoMove => {
            // One sprite at origin, phase=Vanish immediately (spec §4.5 item 0).
            let mut s = SpriteSpawn::simple(origin_px, aim);
            s.is_static = true;
            s.start_vanished = true;
            vec![s]
        }

        move_kind::FixedPosition | move_kind::Transport | move_kind::Summon | move_kind::TimeStop => {
            let mut s = SpriteSpawn::simple(geometry::tile_to_pixel(destination), aim);
            s.is_static = true;
            vec![s]
        }

        move_kind::SingleMove | move_kind::Throw => {
            vec![SpriteSpawn::simple(origin_px, aim)]
        }

        move_kind::LineMove => {
            // `min(level, 10)` sprites staggered by 60ms along targetDir
            // (spec §4.5 item 3).
            let count = (level as i32).clamp(1, 10);
            (0..count)
                .map(|i| {
                    let mut s = SpriteSpawn::simple(origin_px, aim);
                    s.delay_ms = i as f32 * 60.0;
                    s
                })
                .collect()
        }

        move_kind::CircleMove => {
            // 32 sprites, one per direction, launched simultaneously.
            (0..32u8)
                .map(|dir| SpriteSpawn::simple(origin_px, dir))
                .collect()
        }

        move_kind::HeartMove => {
            // Two lobes staggered in time: the 16 "upper" directions fire
            // immediately, the 16 "lower" directions follow one frame later.
            (0..32u8)
                .map(|dir| {
                    let mut s = SpriteSpawn::simple(origin_px, dir);
                    if dir >= 16 {
                        s.delay_ms = 80.0;
                    }
                    s
                })
                .collect()
        }

        move_kind::SpiralMove => {
            // 32 sprites along consecutive 32-dirs, each delayed by
            // i*30ms (spec §4.5 item 6).
            (0..32u8)
                .map(|i| {
                    let mut s = SpriteSpawn::simple(origin_px, (aim + i) % 32);
                    s.delay_ms = i as f32 * 30.0;
                    s
                })
                .collect()
        }

        move_kind::SectorMove => {
            // Center sprite + 2*count symmetric pairs, stride 2 in 32-dir
            // space; count = 1 + floor((level-1)/3) (spec §4.5 item 7).
            let count = pair_count(level);
            let mut spawns = vec![SpriteSpawn::simple(origin_px, aim)];
            for i in 1..=count {
                let off = i * 2;
                spawns.push(SpriteSpawn::simple(origin_px, ((aim as i32 + off).rem_euclid(32)) as u8));
                spawns.push(SpriteSpawn::simple(origin_px, ((aim as i32 - off).rem_euclid(32)) as u8));
            }
            spawns
        }

        move_kind::RandomSector => {
            // 2*count+1 sprites with a random +/-2 32-dir offset around
            // targetDir; count = 1 + floor((level-1)/3) (spec §4.5 item 8).
            let count = pair_count(level);
            (0..(2 * count + 1))
                .map(|_| {
                    let offset = rng.random_index(5) as i32 - 2;
                    let dir = ((aim as i32 + offset).rem_euclid(32)) as u8;
                    SpriteSpawn::simple(origin_px, dir)
                })
                .collect()
        }

        move_kind::FixedWall => {
            // Static row at destination, perpendicular to facing, count
            // 3 + 2*max(0,level-1) (spec §4.5 item 9).
            wall_row(geometry::tile_to_pixel(destination), aim, wall_count(level), true)
        }

        move_kind::WallMove => {
            // Same row as FixedWall, but every sprite moves along
            // targetDir (spec §4.5 item 10).
            wall_row(origin_px, aim, wall_count(level), false)
        }

        move_kind::RegionBased => build_region(origin, region, range_radius, aim),

        move_kind::Follow | move_kind::FollowTraceB | move_kind::FollowTraceC => {
            vec![SpriteSpawn::simple(origin_px, aim)]
        }

        move_kind::SuperMode => {
            // A cast sprite at the origin, plus a target sprite that
            // waits for the cast sprite to finish (handled by the
            // engine via `WAIT_FOR_CAST_SENTINEL`).
            let mut cast = SpriteSpawn::simple(origin_px, aim);
            cast.is_static = true;
            let mut target = SpriteSpawn::simple(geometry::tile_to_pixel(destination), aim);
            target.is_static = true;
            target.delay_ms = super::WAIT_FOR_CAST_SENTINEL;
            vec![cast, target]
        }

        move_kind::Kind19 => {
            // `3 + floor(level/2)` sprites at polar offsets around origin,
            // staggered by i*80ms (spec §4.5 item 19).
            let count = 3 + (level as i32) / 2;
            (0..count)
                .map(|i| {
                    let dir = ((i * 32 / count) as u8) % 32;
                    let mut s = SpriteSpawn::simple(origin_px, dir);
                    s.delay_ms = i as f32 * 80.0;
                    s
                })
                .collect()
        }

        move_kind::VMove => {
            // Center + `level` pairs at V-offset positions, all moving
            // targetDir (spec §4.5 item 24).
            let perp = (aim + 8) % 32;
            let perp_dir = Direction8::from_direction32(perp);
            let (ux, uy) = perp_dir.unit_vector();
            let mut spawns = vec![SpriteSpawn::simple(origin_px, aim)];
            for i in 1..=(level as i32).max(1) {
                for side in [-1.0f32, 1.0] {
                    let pos = PixelPos::new(
                        origin_px.x + ux * 16.0 * i as f32 * side,
                        origin_px.y + uy * 16.0 * i as f32 * side,
                    );
                    spawns.push(SpriteSpawn::simple(pos, aim));
                }
            }
            spawns
        }

        _ => vec![SpriteSpawn::simple(origin_px, aim)],
    }
}

/// `3 + 2*max(0,level-1)` (spec §4.5 items 9/10).
fn wall_count(level: u8) -> i32 {
    3 + 2 * (level as i32 - 1).max(0)
}

/// A row of `count` sprites centered on `anchor`, spaced perpendicular to
/// `aim`, either static (`FixedWall`) or moving along `aim` (`WallMove`).
fn wall_row(anchor: PixelPos, aim: u8, count: i32, is_static: bool) -> Vec<SpriteSpawn> {
    let perp = (aim + 8) % 32;
    let perp_dir = Direction8::from_direction32(perp);
    let (ux, uy) = perp_dir.unit_vector();
    let half = count / 2;
    (-half..=half)
        .take(count as usize)
        .map(|i| {
            let pos = PixelPos::new(anchor.x + ux * 16.0 * i as f32, anchor.y + uy * 16.0 * i as f32);
            let mut s = SpriteSpawn::simple(pos, aim);
            s.is_static = is_static;
            s
        })
        .collect()
}

fn build_region(
    origin: TilePos,
    region: crate::assets::RegionShape,
    radius: i32,
    aim: u8,
) -> Vec<SpriteSpawn> {
    use crate::assets::RegionShape::*;
    let r = radius.max(0);
    let mut tiles = Vec::new();
    match region {
        Square => {
            for dy in -r..=r {
                for dx in -r..=r {
                    tiles.push(TilePos::new(origin.x + dx, origin.y + dy));
                }
            }
        }
        Cross => {
            for d in -r..=r {
                tiles.push(TilePos::new(origin.x + d, origin.y));
                tiles.push(TilePos::new(origin.x, origin.y + d));
            }
            tiles.sort_by_key(|t| (t.x, t.y));
            tiles.dedup();
        }
        Rectangle => {
            for dy in -r..=r {
                for dx in -(r * 2)..=(r * 2) {
                    tiles.push(TilePos::new(origin.x + dx, origin.y + dy));
                }
            }
        }
        IsoTriangle => {
            for dy in 0..=r {
                for dx in -dy..=dy {
                    tiles.push(TilePos::new(origin.x + dx, origin.y + dy));
                }
            }
        }
        V => {
            for d in 0..=r {
                tiles.push(TilePos::new(origin.x - d, origin.y + d));
                tiles.push(TilePos::new(origin.x + d, origin.y + d));
            }
            tiles.sort_by_key(|t| (t.x, t.y));
            tiles.dedup();
        }
    }
    tiles
        .into_iter()
        .map(|t| {
            let mut s = SpriteSpawn::simple(geometry::tile_to_pixel(t), aim);
            s.is_static = true;
            s
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::RegionShape;

    #[test]
    fn circle_move_spawns_32_distinct_sprites() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(
            move_kind::CircleMove,
            1,
            TilePos::new(5, 5),
            TilePos::new(5, 5),
            RegionShape::Square,
            0,
            &mut rng,
        );
        assert_eq!(spawns.len(), 32);
        let mut dirs: Vec<u8> = spawns.iter().map(|s| s.dir32).collect();
        dirs.sort_unstable();
        dirs.dedup();
        assert_eq!(dirs.len(), 32);
    }

    #[test]
    fn super_mode_target_waits_for_cast() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(
            move_kind::SuperMode,
            1,
            TilePos::new(0, 0),
            TilePos::new(3, 0),
            RegionShape::Square,
            0,
            &mut rng,
        );
        assert_eq!(spawns.len(), 2);
        assert_eq!(spawns[1].delay_ms, super::super::WAIT_FOR_CAST_SENTINEL);
    }

    #[test]
    fn region_square_covers_full_side_length() {
        let spawns = build_region(TilePos::new(0, 0), RegionShape::Square, 1, 0);
        assert_eq!(spawns.len(), 9);
    }

    #[test]
    fn line_move_sprite_count_matches_level_capped_at_ten() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(move_kind::LineMove, 4, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 4);
        let spawns = build(move_kind::LineMove, 15, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 10);
    }

    #[test]
    fn sector_move_pair_count_grows_with_level() {
        let mut rng = GameRng::from_seed(1);
        // level 1..=3 => count=1 => 1 center + 2 = 3 sprites.
        let spawns = build(move_kind::SectorMove, 2, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 3);
        // level 4..=6 => count=2 => 1 center + 4 = 5 sprites.
        let spawns = build(move_kind::SectorMove, 5, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 5);
    }

    #[test]
    fn no_move_spawns_one_sprite_already_vanishing() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(move_kind::NoMove, 1, TilePos::new(0, 0), TilePos::new(0, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 1);
        assert!(spawns[0].start_vanished);
    }

    #[test]
    fn spiral_move_spawns_32_sprites_staggered_by_30ms() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(move_kind::SpiralMove, 1, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 32);
        assert_eq!(spawns[1].delay_ms, 30.0);
        assert_eq!(spawns[31].delay_ms, 31.0 * 30.0);
    }

    #[test]
    fn fixed_wall_row_grows_with_level() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(move_kind::FixedWall, 1, TilePos::new(0, 0), TilePos::new(3, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 3);
        let spawns = build(move_kind::FixedWall, 3, TilePos::new(0, 0), TilePos::new(3, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 7);
        assert!(spawns.iter().all(|s| s.is_static));
    }

    #[test]
    fn v_move_pair_count_matches_level() {
        let mut rng = GameRng::from_seed(1);
        let spawns = build(move_kind::VMove, 3, TilePos::new(0, 0), TilePos::new(1, 0), RegionShape::Square, 0, &mut rng);
        assert_eq!(spawns.len(), 7);
    }
}
