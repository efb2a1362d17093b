//! Particle Effects
//!
//! Visual-only bursts for crashes and pickups. Nothing here feeds back
//! into gameplay.

use crate::game::state::{Particle, ParticleKind, RaceState};
use crate::FIELD_HEIGHT;

/// Maximum live particles
pub const MAX_PARTICLES: usize = 50;

/// Positional jitter around the burst origin
const SPAWN_JITTER: f32 = 10.0;

impl ParticleKind {
    /// Starting life in ticks.
    pub fn life(self) -> i32 {
        match self {
            ParticleKind::Explosion => 45,
            ParticleKind::Smoke => 60,
            ParticleKind::Normal => 30,
        }
    }

    /// Max speed per axis.
    fn spread(self) -> f32 {
        match self {
            ParticleKind::Explosion => 4.0,
            ParticleKind::Smoke | ParticleKind::Normal => 2.0,
        }
    }

    /// Size range `[min, max)`.
    fn size_range(self) -> (f32, f32) {
        match self {
            ParticleKind::Explosion => (4.0, 12.0),
            ParticleKind::Smoke => (2.0, 8.0),
            ParticleKind::Normal => (2.0, 6.0),
        }
    }
}

/// Emit `count` particles around `(x, y)`.
///
/// The live set is truncated to [`MAX_PARTICLES`] afterwards, so when the
/// cap is reached the newest particles are the ones dropped.
pub fn emit_burst(state: &mut RaceState, x: f32, y: f32, count: u32, kind: ParticleKind) {
    let first_id = state.reserve_particle_ids(count);
    let spread = kind.spread();
    let (min_size, max_size) = kind.size_range();

    for i in 0..count {
        let rng = &mut state.rng;
        let particle = Particle {
            id: first_id.wrapping_add(i),
            x: x + rng.next_range(-SPAWN_JITTER, SPAWN_JITTER),
            y: y + rng.next_range(-SPAWN_JITTER, SPAWN_JITTER),
            vx: rng.next_range(-spread, spread),
            vy: rng.next_range(-spread, spread),
            life: kind.life(),
            kind,
            size: rng.next_range(min_size, max_size),
        };
        state.particles.push(particle);
    }

    state.particles.truncate(MAX_PARTICLES);
}

/// Advance every particle one tick and drop the expired ones.
pub fn advance_particles(state: &mut RaceState) {
    for particle in &mut state.particles {
        particle.x += particle.vx;
        particle.y += particle.vy;
        particle.life -= 1;
    }

    state
        .particles
        .retain(|p| p.life > 0 && p.y < FIELD_HEIGHT);
    state.particles.truncate(MAX_PARTICLES);
}
