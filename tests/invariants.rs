//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use std::cell::Cell;
use std::convert::Infallible;

use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use logoforge_core::{
    derive_parameters, digest, digest_sync, params::FieldKind, score_artifact, select_best, Candidate,
    DedupRegistry, Digest, DigestEngine, EngineConfig, FileStore, GenerateRequest, HashInput,
    HashRecord, LogoEngine, MemoryStore, ParamField, RenderContext, ShapeRenderer, StyleVariant,
    Symmetry,
};

const FIXTURE_MESSAGE: &str = "acme|technology|1700000000000|abc123";
const FIXTURE_DIGEST: &str = "8440d84b0bb21c00956bb1b1d9abb315b4572f6849fd831acc510d4d359c1f35";

fn fixture_input() -> HashInput {
    HashInput::new("Acme", "technology", 1_700_000_000_000, "abc123")
}

fn record_for(n: usize) -> HashRecord {
    HashRecord {
        digest: digest(&format!("brand-{}", n)),
        brand_name: format!("Brand {}", n % 7),
        algorithm_id: "wave".to_string(),
        variant_index: 0,
        created_at: Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
        quality_score: 75,
    }
}

/// Scores each attempt by rendering a different number of curves.
struct ScriptedRenderer {
    artifacts: Vec<String>,
    calls: Cell<usize>,
}

impl ScriptedRenderer {
    fn new(artifacts: Vec<String>) -> Self {
        Self { artifacts, calls: Cell::new(0) }
    }
}

impl ShapeRenderer for ScriptedRenderer {
    type Error = Infallible;

    fn algorithm_id(&self) -> &str {
        "scripted"
    }

    fn render(&self, _ctx: &RenderContext<'_>) -> Result<String, Infallible> {
        let i = self.calls.get();
        self.calls.set(i + 1);
        Ok(self.artifacts[i % self.artifacts.len()].clone())
    }
}

struct BrokenRenderer;

impl ShapeRenderer for BrokenRenderer {
    type Error = String;

    fn algorithm_id(&self) -> &str {
        "broken"
    }

    fn render(&self, ctx: &RenderContext<'_>) -> Result<String, String> {
        Err(format!("cannot draw {}", ctx.input.name))
    }
}

#[test]
fn invariant_digest_deterministic_across_backends() {
    let input = fixture_input();
    assert_eq!(input.message(), FIXTURE_MESSAGE);

    let native = DigestEngine::native().digest_input(&input);
    let portable = DigestEngine::portable().digest_input(&input);
    assert_eq!(native, portable);
    assert_eq!(native.as_str(), FIXTURE_DIGEST);
    assert_eq!(digest(FIXTURE_MESSAGE), digest(FIXTURE_MESSAGE));
}

#[test]
fn invariant_conformance_fixture() {
    let digest = Digest::from_hex(FIXTURE_DIGEST).unwrap();
    let params = derive_parameters(&digest);

    assert_eq!(params.element_count, 5);
    assert_eq!(params.layer_count, 2);
    assert_eq!(params.point_count, 3);
    assert_eq!(params.symmetry, Symmetry::Bilateral);
    assert_eq!(params.style_variant, StyleVariant::Bold);
    assert_eq!(params.color_placement, 0);
    assert!((params.rotation_offset - 2827.0 / 4095.0 * 360.0).abs() < 1e-9);

    // repeated derivation is identical
    assert_eq!(params, derive_parameters(&digest));
}

#[test]
fn invariant_parameters_in_range() {
    let mut rng = StdRng::seed_from_u64(0x1060);
    let mut bytes = [0u8; 32];

    for _ in 0..10_000 {
        rng.fill_bytes(&mut bytes);
        let digest = Digest::from_bytes(bytes);
        let params = derive_parameters(&digest);

        for field in ParamField::ALL {
            let spec = field.spec();
            let value = params.value(field);
            match spec.kind {
                FieldKind::Choice(size) => {
                    assert!(value >= 0.0 && value < f64::from(size), "{} = {}", spec.name, value);
                }
                FieldKind::Count => {
                    assert_eq!(value.fract(), 0.0);
                    assert!(value >= spec.min && value <= spec.max, "{} = {}", spec.name, value);
                }
                FieldKind::Continuous => {
                    assert!(value >= spec.min && value <= spec.max, "{} = {}", spec.name, value);
                }
            }
        }
    }
}

#[test]
fn invariant_early_exit_single_cycle() {
    let config = EngineConfig { max_attempts: 10, quality_threshold: 1, ..EngineConfig::default() };
    let engine = LogoEngine::new(config, MemoryStore::new());
    let renderer = ScriptedRenderer::new(vec![r#"<path d="M 10 10 C 20 20 30 30 40 40"/>"#.into()]);

    let logo = engine.generate(&GenerateRequest::new("Acme", "technology"), &renderer).unwrap();
    assert_eq!(renderer.calls.get(), 1);
    assert_eq!(logo.attempts_used, 1);
}

#[test]
fn invariant_more_attempts_never_worse() {
    // Deterministic attempt sequence: fixed timestamp + salt
    let artifacts: Vec<String> = (0..8)
        .map(|k| {
            let curves = " C 45 45 55 55 50 50".repeat(k);
            format!(r#"<path d="M 50 50{} L 40 60 Z"/>"#, curves)
        })
        .collect();
    let request = GenerateRequest::new("Acme", "technology")
        .with_salt("fixed")
        .with_timestamp(1_700_000_000_000);

    let mut previous = 0;
    for k in 1..=8 {
        let config = EngineConfig { max_attempts: k, quality_threshold: 100, ..EngineConfig::default() };
        let engine = LogoEngine::new(config, MemoryStore::new());
        let renderer = ScriptedRenderer::new(artifacts.clone());
        let logo = engine.generate(&request, &renderer).unwrap();
        assert!(logo.metrics.score >= previous, "k={} regressed", k);
        previous = logo.metrics.score;
    }
}

#[test]
fn invariant_selection_fold_monotonic() {
    let scores = [33u8, 12, 58, 58, 41, 77, 3];
    let mut previous = 0;
    for k in 1..=scores.len() as u32 {
        let selection = select_best(k, 101, |n| {
            Ok::<_, Infallible>(Candidate::new(n, scores[(n - 1) as usize]))
        })
        .unwrap();
        assert!(selection.score >= previous);
        previous = selection.score;
    }
    assert_eq!(previous, 77);
}

#[test]
fn invariant_renderer_error_propagates() {
    let engine = LogoEngine::new(EngineConfig::default(), MemoryStore::new());
    let err = engine
        .generate(&GenerateRequest::new("Acme", "technology"), &BrokenRenderer)
        .unwrap_err();
    assert_eq!(err, "cannot draw Acme");
    assert!(engine.registry().is_empty());
}

#[test]
fn invariant_registry_bound() {
    let capacity = 100;
    let registry = DedupRegistry::with_capacity(MemoryStore::new(), capacity);

    for n in 0..capacity + 50 {
        registry.record(record_for(n));
        // duplicates never grow the registry
        registry.record(record_for(n));
    }

    let entries = registry.entries();
    assert_eq!(entries.len(), capacity);
    let expected: Vec<Digest> = (50..capacity + 50).map(|n| record_for(n).digest).collect();
    let actual: Vec<Digest> = entries.into_iter().map(|r| r.digest).collect();
    assert_eq!(actual, expected);
}

#[test]
fn invariant_registry_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    {
        let registry = DedupRegistry::new(FileStore::new(dir.path()));
        registry.record(record_for(1));
    }
    let reopened = DedupRegistry::new(FileStore::new(dir.path()));
    assert!(reopened.has(&record_for(1).digest));
    assert_eq!(reopened.for_brand("brand 1").len(), 1);
}

#[test]
fn invariant_corrupt_file_is_empty_state() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("logo_hash_registry.json"), "\u{0}garbage").unwrap();
    let registry = DedupRegistry::new(FileStore::new(dir.path()));
    assert!(registry.is_empty());
    registry.record(record_for(3));
    assert_eq!(registry.len(), 1);
}

proptest! {
    #[test]
    fn score_is_bounded(artifact in ".{0,400}", seed in any::<[u8; 32]>()) {
        let params = derive_parameters(&Digest::from_bytes(seed));
        let metrics = score_artifact(&artifact, &params);
        prop_assert!(metrics.score <= 100);
        for sub in [
            metrics.path_smoothness,
            metrics.visual_balance,
            metrics.complexity,
            metrics.golden_ratio_adherence,
            metrics.uniqueness,
        ] {
            prop_assert!(sub <= 100);
        }
    }

    #[test]
    fn svg_like_scores_are_bounded(
        coords in prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 0..40),
        seed in any::<[u8; 32]>(),
    ) {
        let data: String = coords.iter().map(|(x, y)| format!("C {} {} ", x, y)).collect();
        let artifact = format!(r#"<path d="M 0 0 {}Z"/>"#, data);
        let metrics = score_artifact(&artifact, &derive_parameters(&Digest::from_bytes(seed)));
        prop_assert!(metrics.score <= 100);
    }

    #[test]
    fn backends_agree_on_any_string(message in ".*") {
        prop_assert_eq!(digest(&message), digest_sync(&message));
    }
}
