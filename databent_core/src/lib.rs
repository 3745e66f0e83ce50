pub mod codec;
pub mod config;
pub mod input;
pub mod mutator;
pub mod pipeline;
pub mod report;
pub mod span;
pub mod store;

pub use codec::{CodecError, PngRenderer, RenderError, Renderer, to_container};
pub use config::{ConfigError, DatabentConfig, OutputConfig, SafeZoneConfig, VariantSettings};
pub use input::Input;
pub use mutator::{ChunkDeletionMutator, Corruption, Mutator, corrupt};
pub use pipeline::{Variant, generate_variants};
pub use report::Report;
pub use span::{RemovedRange, original_spans, replay};
pub use store::{InMemoryStore, OnDiskStore, StoreError, StoredVariant, VariantStore};
