//! LogoForge Core - Parametric Generation Engine
//!
//! # The Invariants (Non-Negotiable)
//! 1. Digests Are Pure - same input, same digest, on every backend
//! 2. Parameters Stay In Range - derivation is total
//! 3. Scores Are Bounded - composite is a fixed weighted sum in 0..=100
//! 4. Search Only Improves - more attempts never return a worse result
//! 5. The Registry Is Bounded - oldest entries leave first
//! 6. Persistence Never Blocks Generation

pub mod config;
pub mod hashing;
pub mod params;
pub mod pipeline;
pub mod registry;
pub mod rng;
pub mod scoring;
pub mod selection;
pub mod sha256;
pub mod storage;

pub use config::{ConfigError, EngineConfig, RegistryConfig, ScoringConfig};
pub use hashing::{
    digest, digest_sync, generate_hash_input, Digest, DigestBackend, DigestBackendKind, DigestEngine,
    DigestError, HashInput,
};
pub use params::{derive_parameters, DerivedParameters, ParamField, StyleVariant, Symmetry};
pub use pipeline::{GenerateRequest, GeneratedLogo, LogoEngine, RenderContext, ShapeRenderer};
pub use registry::{DedupRegistry, HashRecord};
pub use rng::{create_rng, SeededRng};
pub use scoring::{score_artifact, QualityMetrics, QualityScorer};
pub use selection::{select_best, Candidate, Selection};
pub use storage::{FileStore, KeyValueStore, MemoryStore, NullStore, StoreError};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
