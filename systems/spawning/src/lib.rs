#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Wave spawning system: counts down to each wave, composes it and releases
//! staggered spawn commands.

use std::{collections::VecDeque, time::Duration};

use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};
use visceral_reclaimer_config::WaveConfig;
use visceral_reclaimer_core::{Command, EnemyKind, Event};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug)]
pub struct Config {
    waves: WaveConfig,
    rows: u32,
    rng_seed: u64,
}

impl Config {
    /// Creates a new configuration from the wave table, the number of grid
    /// rows enemies may enter on, and a seed.
    #[must_use]
    pub fn new(waves: WaveConfig, rows: u32, rng_seed: u64) -> Self {
        Self {
            waves,
            rows,
            rng_seed,
        }
    }
}

#[derive(Clone, Debug)]
struct PendingSpawn {
    due: Duration,
    kind: EnemyKind,
    row: u32,
}

/// Pure system that emits wave and spawn commands as simulation time passes.
#[derive(Debug)]
pub struct Spawning {
    waves: WaveConfig,
    rows: u32,
    elapsed: Duration,
    next_wave_at: Duration,
    wave: u32,
    pending: VecDeque<PendingSpawn>,
    rng: ChaCha8Rng,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let next_wave_at = config.waves.interval();
        Self {
            waves: config.waves,
            rows: config.rows,
            elapsed: Duration::ZERO,
            next_wave_at,
            wave: 0,
            pending: VecDeque::new(),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
        }
    }

    /// Whole seconds until the next wave begins, rounded up.
    #[must_use]
    pub fn seconds_until_next_wave(&self) -> u64 {
        let remaining = self.next_wave_at.saturating_sub(self.elapsed);
        let whole = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            whole + 1
        } else {
            whole
        }
    }

    /// Number of spawns queued but not yet released.
    #[must_use]
    pub fn pending_spawns(&self) -> usize {
        self.pending.len()
    }

    /// Consumes time events and emits wave and spawn commands.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }

        if accumulated.is_zero() {
            return;
        }

        self.elapsed = self.elapsed.saturating_add(accumulated);
        for started_at in self.resolve_due_waves() {
            self.begin_wave(started_at, out);
        }
        self.release_due_spawns(out);
    }

    /// Start times of every wave that came due, oldest first.
    fn resolve_due_waves(&mut self) -> Vec<Duration> {
        let interval = self.waves.interval();
        if interval.is_zero() {
            return Vec::new();
        }

        let mut started = Vec::new();
        while self.elapsed >= self.next_wave_at {
            started.push(self.next_wave_at);
            self.next_wave_at += interval;
        }
        started
    }

    fn begin_wave(&mut self, started_at: Duration, out: &mut Vec<Command>) {
        self.wave = self.wave.saturating_add(1);
        let wave = self.wave;
        let enemies = self.waves.enemy_count(wave);
        out.push(Command::BeginWave { wave, enemies });

        let eligible = self.waves.eligible_enemies(wave);
        if eligible.is_empty() || self.rows == 0 {
            warn!(wave, "no enemy types eligible for wave");
            return;
        }

        let delay = self.waves.spawn_delay();
        for index in 0..enemies {
            let Some(kind) = eligible.choose(&mut self.rng).cloned() else {
                continue;
            };
            let row = self.rng.gen_range(0..self.rows);
            self.pending.push_back(PendingSpawn {
                due: started_at + delay * index,
                kind,
                row,
            });
        }
        debug!(wave, enemies, "wave composed");
    }

    fn release_due_spawns(&mut self, out: &mut Vec<Command>) {
        while self
            .pending
            .front()
            .is_some_and(|spawn| spawn.due <= self.elapsed)
        {
            let Some(spawn) = self.pending.pop_front() else {
                break;
            };
            out.push(Command::SpawnEnemy {
                kind: spawn.kind,
                row: spawn.row,
            });
        }
    }
}
