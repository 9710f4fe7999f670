//! Generation Pipeline - Single Entry Point
//!
//! digest -> parameters -> render -> score, repeated under `select_best`,
//! then the winner is checked against and recorded in the dedup registry.
//! Renderer failures propagate unchanged; registry failures never block.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::EngineConfig;
use crate::hashing::{random_salt, Digest, DigestEngine, HashInput};
use crate::params::{derive_parameters, DerivedParameters};
use crate::registry::{DedupRegistry, HashRecord};
use crate::rng::SeededRng;
use crate::scoring::{QualityMetrics, QualityScorer};
use crate::selection::{select_best, Candidate};
use crate::storage::KeyValueStore;

/// Everything a shape generator sees for one attempt.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub input: &'a HashInput,
    pub digest: &'a Digest,
    pub params: &'a DerivedParameters,
}

impl RenderContext<'_> {
    /// Jitter source seeded by this attempt's digest.
    pub fn rng(&self) -> SeededRng {
        SeededRng::new(self.digest.as_str())
    }
}

/// Seam to the shape generators.
pub trait ShapeRenderer {
    type Error;

    fn algorithm_id(&self) -> &str;

    /// Produce the SVG artifact for one attempt.
    fn render(&self, ctx: &RenderContext<'_>) -> Result<String, Self::Error>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub name: String,
    pub category: String,
    /// Reuse a salt to regenerate an earlier result.
    #[serde(default)]
    pub salt: Option<String>,
    /// Milliseconds since the epoch; defaults to now.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub variant_index: u32,
}

impl GenerateRequest {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            salt: None,
            timestamp: None,
            variant_index: 0,
        }
    }

    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_variant(mut self, variant_index: u32) -> Self {
        self.variant_index = variant_index;
        self
    }

    /// Input for attempt `n` (1-based). A supplied salt is used as-is on
    /// the first attempt and suffixed with `-n` afterwards.
    fn attempt_input(&self, n: u32, timestamp: i64) -> HashInput {
        let salt = match &self.salt {
            Some(salt) if n == 1 => salt.clone(),
            Some(salt) => format!("{}-{}", salt, n),
            None => random_salt(),
        };
        HashInput::new(self.name.clone(), self.category.clone(), timestamp, salt)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedLogo {
    pub artifact: String,
    pub input: HashInput,
    pub digest: Digest,
    pub params: DerivedParameters,
    pub metrics: QualityMetrics,
    pub algorithm_id: String,
    pub variant_index: u32,
    pub attempts_used: u32,
    /// The winning digest was already in the registry.
    pub was_duplicate: bool,
}

struct Attempt {
    input: HashInput,
    digest: Digest,
    params: DerivedParameters,
    artifact: String,
    metrics: QualityMetrics,
}

/// The generation engine - owns digest backend, scorer and registry.
pub struct LogoEngine<S> {
    config: EngineConfig,
    digest: DigestEngine,
    scorer: QualityScorer,
    registry: DedupRegistry<S>,
}

impl<S: KeyValueStore> LogoEngine<S> {
    pub fn new(config: EngineConfig, store: S) -> Self {
        Self {
            digest: DigestEngine::new(config.digest_backend.backend()),
            scorer: QualityScorer::new(&config.scoring),
            registry: DedupRegistry::from_config(store, &config.registry),
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &DedupRegistry<S> {
        &self.registry
    }

    pub fn digest_engine(&self) -> &DigestEngine {
        &self.digest
    }

    /// Score a rendered artifact with this engine's bands.
    pub fn score(&self, artifact: &str, params: &DerivedParameters) -> QualityMetrics {
        self.scorer.score(artifact, params)
    }

    /// Run the bounded candidate search and record the winner.
    #[instrument(skip_all, fields(brand = %request.name, algorithm = renderer.algorithm_id()))]
    pub fn generate<R: ShapeRenderer>(
        &self,
        request: &GenerateRequest,
        renderer: &R,
    ) -> Result<GeneratedLogo, R::Error> {
        let timestamp = request
            .timestamp
            .unwrap_or_else(|| Utc::now().timestamp_millis());

        let selection = select_best(self.config.max_attempts, self.config.quality_threshold, |n| {
            let attempt = self.attempt(request.attempt_input(n, timestamp), renderer)?;
            let score = attempt.metrics.score;
            Ok(Candidate::new(attempt, score))
        })?;

        let best = selection.best;
        let was_duplicate = self.registry.has(&best.digest);
        if was_duplicate {
            info!(digest = %best.digest, "regenerated a previously recorded design");
        }

        self.registry.record(HashRecord {
            digest: best.digest.clone(),
            brand_name: request.name.clone(),
            algorithm_id: renderer.algorithm_id().to_string(),
            variant_index: request.variant_index,
            created_at: Utc::now(),
            quality_score: best.metrics.score,
        });

        info!(
            score = selection.score,
            attempts = selection.attempts_used,
            threshold_met = selection.threshold_met,
            "logo selected"
        );

        Ok(GeneratedLogo {
            artifact: best.artifact,
            input: best.input,
            digest: best.digest,
            params: best.params,
            metrics: best.metrics,
            algorithm_id: renderer.algorithm_id().to_string(),
            variant_index: request.variant_index,
            attempts_used: selection.attempts_used,
            was_duplicate,
        })
    }

    fn attempt<R: ShapeRenderer>(&self, input: HashInput, renderer: &R) -> Result<Attempt, R::Error> {
        let digest = self.digest.digest_input(&input);
        let params = derive_parameters(&digest);
        let artifact = renderer.render(&RenderContext {
            input: &input,
            digest: &digest,
            params: &params,
        })?;
        let metrics = self.scorer.score(&artifact, &params);
        Ok(Attempt { input, digest, params, artifact, metrics })
    }
}
