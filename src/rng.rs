//! Centralized seeded PRNG (spec §9: "Tick determinism under RNG").
//!
//! Every random draw in the simulation — random-tile patrol walk,
//! `RandSound` triggers, random-sector magic spread — goes through a single
//! `GameRng` owned by the `WorldContext`, so replays with the same seed are
//! bit-for-bit reproducible.

use bevy::prelude::Resource;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Debug, Resource)]
pub struct GameRng {
    rng: StdRng,
    pub seed: Option<u64>,
}

impl GameRng {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    pub fn random_f32(&mut self) -> f32 {
        self.rng.gen()
    }

    pub fn random_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        min + self.random_f32() * (max - min)
    }

    pub fn random_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        self.rng.gen_range(0..len)
    }

    /// Bernoulli trial with probability `p` in `[0, 1]`.
    pub fn chance(&mut self, p: f32) -> bool {
        self.random_f32() < p
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::from_entropy()
    }
}
