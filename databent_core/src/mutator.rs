use crate::config::{ConfigError, SafeZoneConfig};
use crate::input::Input;
use crate::span::RemovedRange;
use log::{debug, trace};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;

/// The result of one corruption pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corruption {
    /// Seed the generator was initialised from, if the pass was seeded through
    /// [`corrupt`].
    pub seed: Option<u64>,
    /// The buffer after every removal.
    pub bytes: Vec<u8>,
    /// Removed ranges in application order. Each range is relative to the
    /// buffer left by the ranges before it.
    pub removed: Vec<RemovedRange>,
}

/// A `Mutator` turns an encoded buffer into a corrupted copy of it.
///
/// Implementations must draw all randomness from `rng` so a fixed generator
/// state always yields the same `Corruption`. Mutators never fail: running
/// out of room is reported as fewer removed ranges.
///
/// # Type Parameters
/// * `I`: The buffer type being corrupted.
/// * `R`: The random number generator driving the mutation.
pub trait Mutator<I: Input, R: Rng + ?Sized> {
    /// Produces a corrupted copy of `input`.
    ///
    /// # Arguments
    /// * `input`: The buffer to corrupt. It is never modified.
    /// * `rng`: Source of every random decision, consumed in a fixed order.
    ///
    /// # Returns
    /// The corrupted bytes and the removed ranges. `seed` is `None`; seeded
    /// entry points fill it in.
    fn mutate(&self, input: &I, rng: &mut R) -> Corruption;
}

/// Deletes byte chunks whose start offsets fall inside the glitch zone of a
/// [`SafeZoneConfig`].
///
/// The zone is recomputed from the current length before every deletion, so
/// later chunks are placed relative to the already shortened buffer.
#[derive(Debug, Clone)]
pub struct ChunkDeletionMutator {
    config: SafeZoneConfig,
}

impl ChunkDeletionMutator {
    /// Validates `config` and builds a mutator around it.
    pub fn new(config: SafeZoneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SafeZoneConfig {
        &self.config
    }

    /// Runs one pass with a fresh ChaCha8 generator seeded from `seed`.
    pub fn mutate_seeded<I: Input>(&self, input: &I, seed: u64) -> Corruption {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut corruption = self.mutate(input, &mut rng);
        corruption.seed = Some(seed);
        corruption
    }

    fn chunk_count<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        match self.config.min_chunk_count {
            Some(min) => rng.random_range(min..=self.config.target_chunk_count),
            None => self.config.target_chunk_count,
        }
    }
}

impl<I, R> Mutator<I, R> for ChunkDeletionMutator
where
    I: Input,
    R: Rng + ?Sized,
{
    fn mutate(&self, input: &I, rng: &mut R) -> Corruption {
        let cfg = &self.config;
        let mut data = input.to_working_copy();
        let chunk_count = self.chunk_count(rng);
        let mut removed = Vec::with_capacity(chunk_count);

        for _ in 0..chunk_count {
            let file_len = data.len();
            let (zone_start, zone_end) = cfg.zone_bounds(file_len);

            if zone_end.saturating_sub(zone_start) < cfg.max_chunk {
                trace!(
                    "zone {zone_start}..{zone_end} of {file_len} bytes too small for a {}-byte chunk, stopping after {} chunk(s)",
                    cfg.max_chunk,
                    removed.len()
                );
                break;
            }

            let start = rng.random_range(zone_start..=zone_end - cfg.max_chunk);
            let chunk_len = rng.random_range(cfg.min_chunk..=cfg.max_chunk);
            // The final byte is never removed.
            let end = (start + chunk_len).min(file_len.saturating_sub(1)).max(start);

            debug!("removing bytes {start}..{end} of {file_len}");
            data.drain(start..end);
            removed.push(RemovedRange::new(start, end));
        }

        Corruption {
            seed: None,
            bytes: data,
            removed,
        }
    }
}

/// Corrupts `input` with a generator seeded from `seed`.
///
/// The generator lives for this call only, so concurrent calls never
/// influence each other. The only failure is an invalid `config`.
pub fn corrupt<I: Input>(
    input: &I,
    seed: u64,
    config: &SafeZoneConfig,
) -> Result<Corruption, ConfigError> {
    let mutator = ChunkDeletionMutator::new(config.clone())?;
    Ok(mutator.mutate_seeded(input, seed))
}
