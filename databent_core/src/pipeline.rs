use crate::codec::{RenderError, Renderer};
use crate::config::{ConfigError, SafeZoneConfig, VariantSettings};
use crate::input::Input;
use crate::mutator::{ChunkDeletionMutator, Corruption};
use crate::report::Report;
use log::{info, warn};
use std::panic::resume_unwind;
use std::thread;

/// One corrupted output of a source buffer.
///
/// A variant whose container could not be rendered is still a variant: the
/// corrupted bytes and the report are kept and `render` holds the reason.
#[derive(Debug, Clone)]
pub struct Variant {
    pub seed: u64,
    pub corruption: Corruption,
    pub render: Result<Vec<u8>, RenderError>,
    pub report: Report,
}

impl Variant {
    pub fn container(&self) -> &[u8] {
        &self.corruption.bytes
    }

    pub fn png(&self) -> Option<&[u8]> {
        self.render.as_deref().ok()
    }

    pub fn is_rendered(&self) -> bool {
        self.render.is_ok()
    }
}

/// Corrupts, renders and reports a single seed.
pub fn build_variant<I, R>(
    source: &I,
    source_filename: &str,
    seed: u64,
    mutator: &ChunkDeletionMutator,
    renderer: &R,
) -> Variant
where
    I: Input,
    R: Renderer + ?Sized,
{
    let corruption = mutator.mutate_seeded(source, seed);
    let render = renderer.render(&corruption.bytes);

    match &render {
        Ok(png) => info!(
            "seed {seed}: removed {} chunk(s), rendered {} PNG bytes",
            corruption.removed.len(),
            png.len()
        ),
        Err(e) => warn!(
            "seed {seed}: removed {} chunk(s), {} failed: {e}",
            corruption.removed.len(),
            renderer.name()
        ),
    }

    let report = Report::new(
        source_filename,
        source.len(),
        &corruption,
        render.as_ref().err(),
    );
    Variant {
        seed,
        corruption,
        render,
        report,
    }
}

/// Produces `settings.count` variants of `source` with seeds
/// `base_seed + i`, spreading the work over `settings.threads` workers.
///
/// # Arguments
/// * `source`: The container to corrupt. It is never modified.
/// * `source_filename`: Name recorded in every report.
/// * `settings`: Seed range and worker count. An unset base seed counts from 0.
/// * `glitch`: Deletion parameters shared by every variant.
/// * `renderer`: Turns each corrupted container into a displayable image.
///
/// # Returns
/// `Result<Vec<Variant>, ConfigError>`:
///   - `Ok(variants)`: One variant per seed, in seed order regardless of the
///     thread count. Render failures are carried inside each variant.
///   - `Err(error)`: If `glitch` is invalid, detected before any work.
pub fn generate_variants<I, R>(
    source: &I,
    source_filename: &str,
    settings: &VariantSettings,
    glitch: &SafeZoneConfig,
    renderer: &R,
) -> Result<Vec<Variant>, ConfigError>
where
    I: Input,
    R: Renderer + ?Sized,
{
    let mutator = ChunkDeletionMutator::new(glitch.clone())?;
    let seeds: Vec<u64> = settings.seeds().collect();
    let workers = settings.threads.clamp(1, seeds.len().max(1));

    if workers == 1 {
        return Ok(seeds
            .iter()
            .map(|&seed| build_variant(source, source_filename, seed, &mutator, renderer))
            .collect());
    }

    let batch_size = seeds.len().div_ceil(workers);
    let mutator = &mutator;
    let variants = thread::scope(|scope| {
        let handles: Vec<_> = seeds
            .chunks(batch_size)
            .map(|batch| {
                scope.spawn(move || {
                    batch
                        .iter()
                        .map(|&seed| {
                            build_variant(source, source_filename, seed, mutator, renderer)
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap_or_else(|payload| resume_unwind(payload)))
            .collect()
    });
    Ok(variants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PngRenderer, to_container};
    use crate::codec::test_utils::sample_png;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Echoes the container back, or fails every call when `fail` is set.
    struct EchoRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    impl EchoRenderer {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl Renderer for EchoRenderer {
        fn name(&self) -> &'static str {
            "EchoRenderer"
        }

        fn render(&self, container: &[u8]) -> Result<Vec<u8>, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(RenderError::Decode("forced failure".to_string()))
            } else {
                Ok(container.to_vec())
            }
        }
    }

    fn source() -> Vec<u8> {
        (0..20_000).map(|i| (i % 199) as u8).collect()
    }

    #[test]
    fn variants_use_consecutive_seeds_from_base() {
        let settings = VariantSettings {
            base_seed: Some(100),
            count: 4,
            threads: 1,
        };
        let renderer = EchoRenderer::new(false);
        let variants = generate_variants(
            &source(),
            "source.bin",
            &settings,
            &SafeZoneConfig::default(),
            &renderer,
        )
        .unwrap();

        let seeds: Vec<u64> = variants.iter().map(|v| v.seed).collect();
        assert_eq!(seeds, vec![100, 101, 102, 103]);
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 4);
        for variant in &variants {
            assert_eq!(variant.report.seed, Some(variant.seed));
            assert_eq!(variant.png(), Some(variant.container()));
        }
    }

    #[test]
    fn threaded_generation_matches_sequential_generation() {
        let input = source();
        let glitch = SafeZoneConfig::default();
        let sequential = generate_variants(
            &input,
            "source.bin",
            &VariantSettings {
                base_seed: Some(7),
                count: 9,
                threads: 1,
            },
            &glitch,
            &EchoRenderer::new(false),
        )
        .unwrap();
        let threaded = generate_variants(
            &input,
            "source.bin",
            &VariantSettings {
                base_seed: Some(7),
                count: 9,
                threads: 4,
            },
            &glitch,
            &EchoRenderer::new(false),
        )
        .unwrap();

        assert_eq!(sequential.len(), threaded.len());
        for (a, b) in sequential.iter().zip(&threaded) {
            assert_eq!(a.seed, b.seed);
            assert_eq!(a.corruption, b.corruption);
            assert_eq!(a.report, b.report);
        }
    }

    #[test]
    fn render_failure_keeps_corruption_and_report() {
        let settings = VariantSettings {
            base_seed: Some(0),
            count: 2,
            threads: 1,
        };
        let input = source();
        let variants = generate_variants(
            &input,
            "source.bin",
            &settings,
            &SafeZoneConfig::default(),
            &EchoRenderer::new(true),
        )
        .unwrap();

        for variant in &variants {
            assert!(!variant.is_rendered());
            assert!(variant.png().is_none());
            assert!(!variant.corruption.removed.is_empty());
            assert_eq!(variant.report.chunks, variant.corruption.removed);
            assert!(
                variant
                    .report
                    .to_string()
                    .contains("Error opening TIFF or generating PNG")
            );
        }
    }

    #[test]
    fn zero_variants_is_empty_not_an_error() {
        let settings = VariantSettings {
            base_seed: Some(0),
            count: 0,
            threads: 8,
        };
        let variants = generate_variants(
            &source(),
            "source.bin",
            &settings,
            &SafeZoneConfig::default(),
            &EchoRenderer::new(false),
        )
        .unwrap();
        assert!(variants.is_empty());
    }

    #[test]
    fn invalid_glitch_config_is_rejected_before_rendering() {
        let renderer = EchoRenderer::new(false);
        let glitch = SafeZoneConfig {
            min_chunk: 400,
            ..SafeZoneConfig::default()
        };
        let result = generate_variants(
            &source(),
            "source.bin",
            &VariantSettings::default(),
            &glitch,
            &renderer,
        );
        assert!(matches!(result, Err(ConfigError::ChunkBounds { .. })));
        assert_eq!(renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn real_tiff_variants_render_or_report_failure() {
        let container = to_container(&sample_png(96, 96)).unwrap();
        let settings = VariantSettings {
            base_seed: Some(0),
            count: 6,
            threads: 2,
        };
        let variants = generate_variants(
            &container,
            "gradient.png",
            &settings,
            &SafeZoneConfig::default(),
            &PngRenderer::new(),
        )
        .unwrap();

        assert_eq!(variants.len(), 6);
        for variant in &variants {
            assert_eq!(variant.report.is_failure(), !variant.is_rendered());
            assert_eq!(variant.report.original_filename, "gradient.png");
        }
    }
}
