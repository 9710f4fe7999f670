//! Quality Scoring - Rule/Composite Separation
//!
//! Rules produce independent sub-scores in `[0, 100]`.
//! The scorer combines them with fixed weights into the composite.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::ScoringConfig;
use crate::params::DerivedParameters;

pub const WEIGHT_SMOOTHNESS: f64 = 0.20;
pub const WEIGHT_BALANCE: f64 = 0.25;
pub const WEIGHT_COMPLEXITY: f64 = 0.20;
pub const WEIGHT_GOLDEN_RATIO: f64 = 0.15;
pub const WEIGHT_UNIQUENESS: f64 = 0.20;

pub const GOLDEN_RATIO: f64 = 1.618_033_988_749_895;
pub const INVERSE_GOLDEN_RATIO: f64 = GOLDEN_RATIO - 1.0;

const NEUTRAL_SMOOTHNESS: f64 = 50.0;
const NEUTRAL_BALANCE: f64 = 70.0;

static PATH_DATA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\b(?P<attr>d|points)\s*=\s*["'](?P<data>[^"']*)["']"#)
        .expect("valid path data pattern")
});

const NUMBER_PATTERN: &str = r"[-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?";

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(NUMBER_PATTERN).expect("valid number pattern"));

static PATH_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?P<cmd>[MmLlHhVvCcSsQqTtAaZz])|(?P<num>{})", NUMBER_PATTERN))
        .expect("valid path token pattern")
});

/// Sub-metrics and composite for one rendered artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityMetrics {
    pub score: u8,
    pub path_smoothness: u8,
    pub visual_balance: u8,
    pub complexity: u8,
    pub golden_ratio_adherence: u8,
    pub uniqueness: u8,
}

impl QualityMetrics {
    fn from_parts(
        path_smoothness: u8,
        visual_balance: u8,
        complexity: u8,
        golden_ratio_adherence: u8,
        uniqueness: u8,
    ) -> Self {
        let weighted = f64::from(path_smoothness) * WEIGHT_SMOOTHNESS
            + f64::from(visual_balance) * WEIGHT_BALANCE
            + f64::from(complexity) * WEIGHT_COMPLEXITY
            + f64::from(golden_ratio_adherence) * WEIGHT_GOLDEN_RATIO
            + f64::from(uniqueness) * WEIGHT_UNIQUENESS;
        Self {
            score: to_percent(weighted),
            path_smoothness,
            visual_balance,
            complexity,
            golden_ratio_adherence,
            uniqueness,
        }
    }
}

fn to_percent(value: f64) -> u8 {
    if !value.is_finite() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

/// Geometry pulled out of an SVG artifact once, shared by all rules.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactStats {
    /// `d="..."` and `points="..."` attributes found.
    pub path_count: usize,
    pub command_count: usize,
    pub curve_commands: usize,
    pub line_commands: usize,
    pub coordinates: Vec<(f64, f64)>,
}

impl ArtifactStats {
    pub fn parse(artifact: &str) -> Self {
        let mut stats = ArtifactStats::default();

        for caps in PATH_DATA.captures_iter(artifact) {
            let data = &caps["data"];
            stats.path_count += 1;

            if &caps["attr"] == "points" {
                stats.add_polyline(data);
            } else {
                stats.add_path_data(data);
            }
        }

        stats
    }

    /// polygon/polyline: implicit move + straight segments
    fn add_polyline(&mut self, data: &str) {
        let numbers: Vec<f64> = NUMBER
            .find_iter(data)
            .filter_map(|m| m.as_str().parse::<f64>().ok())
            .collect();
        let points: Vec<(f64, f64)> = numbers
            .chunks_exact(2)
            .map(|p| (p[0], p[1]))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        if !points.is_empty() {
            self.command_count += points.len();
            self.line_commands += points.len() - 1;
        }
        self.coordinates.extend(points);
    }

    /// Walks `d` command by command. Argument lists longer than one segment
    /// count as implicit repeats; only points on the outline are collected
    /// (arc radii and flags are skipped, `H`/`V` reuse the current point).
    fn add_path_data(&mut self, data: &str) {
        let mut commands: Vec<(char, Vec<f64>)> = Vec::new();
        for token in PATH_TOKEN.captures_iter(data) {
            if let Some(cmd) = token.name("cmd") {
                let letter = cmd.as_str().chars().next().unwrap_or('Z');
                commands.push((letter, Vec::new()));
            } else if let Some((_, args)) = commands.last_mut() {
                if let Ok(n) = token["num"].parse::<f64>() {
                    args.push(n);
                }
            }
        }

        let mut current = (0.0, 0.0);
        for (letter, args) in commands {
            let arity = command_arity(letter);
            let segments = if arity == 0 { 1 } else { (args.len() / arity).max(1) };
            self.command_count += segments;

            match letter.to_ascii_uppercase() {
                // extra pairs after a moveto are implicit linetos
                'M' => self.line_commands += segments - 1,
                'L' | 'H' | 'V' => self.line_commands += segments,
                'C' | 'S' | 'Q' | 'T' | 'A' => self.curve_commands += segments,
                _ => {}
            }

            if arity == 0 {
                continue;
            }
            for seg in args.chunks_exact(arity) {
                let (x, y) = current;
                match letter.to_ascii_uppercase() {
                    'H' => self.push_point(&mut current, (seg[0], y)),
                    'V' => self.push_point(&mut current, (x, seg[0])),
                    'A' => self.push_point(&mut current, (seg[5], seg[6])),
                    _ => {
                        for pair in seg.chunks_exact(2) {
                            self.push_point(&mut current, (pair[0], pair[1]));
                        }
                    }
                }
            }
        }
    }

    fn push_point(&mut self, current: &mut (f64, f64), point: (f64, f64)) {
        if point.0.is_finite() && point.1.is_finite() {
            *current = point;
            self.coordinates.push(point);
        }
    }
}

/// Numbers consumed by one segment of a path command.
fn command_arity(letter: char) -> usize {
    match letter.to_ascii_uppercase() {
        'M' | 'L' | 'T' => 2,
        'H' | 'V' => 1,
        'S' | 'Q' => 4,
        'C' => 6,
        'A' => 7,
        _ => 0,
    }
}

/// One independent sub-scorer.
pub trait QualityRule: Send + Sync {
    fn name(&self) -> &'static str;
    /// Raw score; clamped and rounded into `[0, 100]` by the scorer.
    fn score(&self, stats: &ArtifactStats, params: &DerivedParameters) -> f64;
}

// --- Concrete Rules ---

/// Rewards a high curve-to-line ratio and a curve count inside the sweet spot.
pub struct PathSmoothnessRule {
    pub sweet_spot: [usize; 2],
}

impl QualityRule for PathSmoothnessRule {
    fn name(&self) -> &'static str { "path_smoothness" }

    fn score(&self, stats: &ArtifactStats, _params: &DerivedParameters) -> f64 {
        let curves = stats.curve_commands;
        let total = curves + stats.line_commands;
        if total == 0 {
            return NEUTRAL_SMOOTHNESS;
        }

        let ratio = curves as f64 / total as f64;
        let [lo, hi] = self.sweet_spot;
        let bonus = if (lo..=hi).contains(&curves) {
            30.0
        } else if curves > hi {
            10.0
        } else if curves > 0 {
            15.0
        } else {
            0.0
        };

        ratio * 70.0 + bonus
    }
}

/// Scores the coordinate centroid's distance from the canvas center.
pub struct VisualBalanceRule {
    pub canvas_size: f64,
    pub min_coordinates: usize,
}

impl QualityRule for VisualBalanceRule {
    fn name(&self) -> &'static str { "visual_balance" }

    fn score(&self, stats: &ArtifactStats, _params: &DerivedParameters) -> f64 {
        let coords = &stats.coordinates;
        if coords.is_empty() || coords.len() < self.min_coordinates {
            return NEUTRAL_BALANCE;
        }

        let n = coords.len() as f64;
        let (sx, sy) = coords
            .iter()
            .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
        let center = self.canvas_size / 2.0;
        let distance = (sx / n - center).hypot(sy / n - center);

        100.0 * (1.0 - distance / center)
    }
}

/// Penalizes command and path counts outside their optimal bands.
pub struct ComplexityRule {
    pub optimal_commands: [usize; 2],
    pub optimal_paths: [usize; 2],
}

impl ComplexityRule {
    const FLOOR: f64 = 40.0;

    fn band_score(&self, count: usize, [lo, hi]: [usize; 2]) -> f64 {
        let count = count as f64;
        let (lo, hi) = (lo as f64, hi as f64);
        if count < lo {
            count / lo * 100.0
        } else if count > hi {
            (100.0 - (count - hi) / hi * 50.0).max(Self::FLOOR)
        } else {
            100.0
        }
    }
}

impl QualityRule for ComplexityRule {
    fn name(&self) -> &'static str { "complexity" }

    fn score(&self, stats: &ArtifactStats, _params: &DerivedParameters) -> f64 {
        let commands = self.band_score(stats.command_count, self.optimal_commands);
        let paths = self.band_score(stats.path_count, self.optimal_paths);
        commands * 0.6 + paths * 0.4
    }
}

/// Bonus for taper, scale and tension ratios close to phi or 1/phi.
pub struct GoldenRatioRule;

impl GoldenRatioRule {
    const BASE: f64 = 55.0;
    const MAX_BONUS: f64 = 15.0;
    const TOLERANCE: f64 = 0.25;

    fn bonus(ratio: f64) -> f64 {
        let closeness = (ratio - GOLDEN_RATIO)
            .abs()
            .min((ratio - INVERSE_GOLDEN_RATIO).abs());
        Self::MAX_BONUS * (1.0 - closeness / Self::TOLERANCE).max(0.0)
    }
}

impl QualityRule for GoldenRatioRule {
    fn name(&self) -> &'static str { "golden_ratio" }

    fn score(&self, _stats: &ArtifactStats, params: &DerivedParameters) -> f64 {
        Self::BASE
            + Self::bonus(params.taper_ratio)
            + Self::bonus(params.scale_factor)
            + Self::bonus(params.curve_tension)
    }
}

/// Penalizes default-looking values; rewards stronger spiral/organic character.
pub struct UniquenessRule;

impl UniquenessRule {
    const BASE: f64 = 75.0;
    const PENALTY: f64 = 5.0;
    const COMMON_VALUES: [f64; 5] = [0.0, 0.25, 0.5, 0.75, 1.0];

    fn looks_default(value: f64) -> bool {
        Self::COMMON_VALUES.iter().any(|c| (value - c).abs() < 0.01)
    }
}

impl QualityRule for UniquenessRule {
    fn name(&self) -> &'static str { "uniqueness" }

    fn score(&self, _stats: &ArtifactStats, params: &DerivedParameters) -> f64 {
        let mut score = Self::BASE;

        for value in [
            params.curve_tension,
            params.scale_factor,
            params.taper_ratio,
            params.spacing_ratio,
            params.inner_radius_ratio,
        ] {
            if Self::looks_default(value) {
                score -= Self::PENALTY;
            }
        }

        let off_axis = params.rotation_offset.rem_euclid(45.0);
        if off_axis < 1.0 || off_axis > 44.0 {
            score -= Self::PENALTY;
        }

        let spiral = ((params.spiral_tightness - 0.1) / 0.9).clamp(0.0, 1.0);
        let organic = (params.organic_variance / 0.4).clamp(0.0, 1.0);
        score + spiral * 12.5 + organic * 12.5
    }
}

/// Runs the five rules and folds them into `QualityMetrics`.
pub struct QualityScorer {
    smoothness: PathSmoothnessRule,
    balance: VisualBalanceRule,
    complexity: ComplexityRule,
    golden_ratio: GoldenRatioRule,
    uniqueness: UniquenessRule,
}

impl QualityScorer {
    pub fn new(config: &ScoringConfig) -> Self {
        Self {
            smoothness: PathSmoothnessRule { sweet_spot: config.curve_sweet_spot },
            balance: VisualBalanceRule {
                canvas_size: config.canvas_size,
                min_coordinates: config.min_coordinates,
            },
            complexity: ComplexityRule {
                optimal_commands: config.optimal_commands,
                optimal_paths: config.optimal_paths,
            },
            golden_ratio: GoldenRatioRule,
            uniqueness: UniquenessRule,
        }
    }

    pub fn score(&self, artifact: &str, params: &DerivedParameters) -> QualityMetrics {
        let stats = ArtifactStats::parse(artifact);

        QualityMetrics::from_parts(
            run_rule(&self.smoothness, &stats, params),
            run_rule(&self.balance, &stats, params),
            run_rule(&self.complexity, &stats, params),
            run_rule(&self.golden_ratio, &stats, params),
            run_rule(&self.uniqueness, &stats, params),
        )
    }
}

fn run_rule(rule: &dyn QualityRule, stats: &ArtifactStats, params: &DerivedParameters) -> u8 {
    let value = to_percent(rule.score(stats, params));
    trace!(rule = rule.name(), value, "sub-score");
    value
}

impl Default for QualityScorer {
    fn default() -> Self {
        Self::new(&ScoringConfig::default())
    }
}

/// Score with the default bands and canvas.
pub fn score_artifact(artifact: &str, params: &DerivedParameters) -> QualityMetrics {
    QualityScorer::default().score(artifact, params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hashing::digest;
    use crate::params::derive_parameters;

    fn params() -> DerivedParameters {
        derive_parameters(&digest("acme|technology|1700000000000|abc123"))
    }

    const CENTERED: &str = r#"<svg viewBox="0 0 100 100">
        <path d="M 30 30 C 40 20, 60 20, 70 30 C 80 40, 80 60, 70 70 C 60 80, 40 80, 30 70 C 20 60, 20 40, 30 30 Z"/>
        <path d="M 45 45 Q 50 40 55 45 Q 60 50 55 55 Q 50 60 45 55 L 45 45 Z"/>
    </svg>"#;

    #[test]
    fn test_parse_counts_commands() {
        let stats = ArtifactStats::parse(CENTERED);
        assert_eq!(stats.path_count, 2);
        assert_eq!(stats.curve_commands, 7);
        assert_eq!(stats.line_commands, 1);
        assert_eq!(stats.command_count, 12);
        assert!(!stats.coordinates.is_empty());
    }

    #[test]
    fn test_arc_contributes_only_its_endpoint() {
        let stats = ArtifactStats::parse(r#"<path d="M 10 10 A 30 30 0 0 1 90 90 L 50 50"/>"#);
        assert_eq!(stats.coordinates, vec![(10.0, 10.0), (90.0, 90.0), (50.0, 50.0)]);
        assert_eq!(stats.curve_commands, 1);
        assert_eq!(stats.line_commands, 1);
    }

    #[test]
    fn test_horizontal_vertical_keep_pairs_aligned() {
        let stats = ArtifactStats::parse(r#"<path d="M 10 10 H 90 V 90 L 10 90 Z"/>"#);
        assert_eq!(
            stats.coordinates,
            vec![(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)]
        );
        assert_eq!(stats.line_commands, 3);
        assert_eq!(stats.command_count, 5);
    }

    #[test]
    fn test_implicit_repeats_count_as_segments() {
        let stats = ArtifactStats::parse(r#"<path d="M 0 0 C 1 1 2 2 3 3 4 4 5 5 6 6"/>"#);
        assert_eq!(stats.curve_commands, 2);
        assert_eq!(stats.command_count, 3);

        let stats = ArtifactStats::parse(r#"<path d="M 0 0 10 10 20 20"/>"#);
        assert_eq!(stats.line_commands, 2);
        assert_eq!(stats.command_count, 3);
        assert_eq!(stats.coordinates.len(), 3);
    }

    #[test]
    fn test_parse_ignores_id_attributes() {
        let stats = ArtifactStats::parse(r#"<g id="mark"><rect width="4"/></g>"#);
        assert_eq!(stats.path_count, 0);
    }

    #[test]
    fn test_polygon_points_are_lines() {
        let stats = ArtifactStats::parse(r#"<polygon points="10,10 90,10 50,90"/>"#);
        assert_eq!(stats.path_count, 1);
        assert_eq!(stats.line_commands, 2);
        assert_eq!(stats.coordinates.len(), 3);
    }

    #[test]
    fn test_empty_artifact_uses_neutral_scores() {
        let metrics = score_artifact("", &params());
        assert_eq!(metrics.path_smoothness, 50);
        assert_eq!(metrics.visual_balance, 70);
        assert_eq!(metrics.complexity, 0);
    }

    #[test]
    fn test_centered_design_balances_well() {
        let metrics = score_artifact(CENTERED, &params());
        assert!(metrics.visual_balance >= 90, "{:?}", metrics);

        let skewed = r#"<path d="M 90 90 L 95 95 L 99 90 L 92 99 Z"/>"#;
        let skewed_metrics = score_artifact(skewed, &params());
        assert!(skewed_metrics.visual_balance < metrics.visual_balance);
    }

    #[test]
    fn test_curves_beat_lines() {
        let curvy = score_artifact(CENTERED, &params());
        let straight = score_artifact(
            r#"<path d="M 30 30 L 70 30 L 70 70 L 30 70 L 30 30 Z"/>"#,
            &params(),
        );
        assert!(curvy.path_smoothness > straight.path_smoothness);
    }

    #[test]
    fn test_complexity_bands() {
        let rule = ComplexityRule { optimal_commands: [8, 60], optimal_paths: [1, 6] };
        assert_eq!(rule.band_score(4, [8, 60]), 50.0);
        assert_eq!(rule.band_score(30, [8, 60]), 100.0);
        assert_eq!(rule.band_score(10_000, [8, 60]), 40.0);
    }

    #[test]
    fn test_golden_ratio_bonus() {
        assert_eq!(GoldenRatioRule::bonus(INVERSE_GOLDEN_RATIO), 15.0);
        assert_eq!(GoldenRatioRule::bonus(0.2), 0.0);
    }

    #[test]
    fn test_composite_is_weighted_sum() {
        let m = score_artifact(CENTERED, &params());
        let expected = (f64::from(m.path_smoothness) * 0.20
            + f64::from(m.visual_balance) * 0.25
            + f64::from(m.complexity) * 0.20
            + f64::from(m.golden_ratio_adherence) * 0.15
            + f64::from(m.uniqueness) * 0.20)
            .round() as u8;
        assert_eq!(m.score, expected);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let p = params();
        assert_eq!(score_artifact(CENTERED, &p), score_artifact(CENTERED, &p));
    }

    #[test]
    fn test_overflowing_numbers_do_not_poison_score() {
        let metrics = score_artifact(r#"<path d="M 1e999 -1e999 L 1e400 5 L 3 3 Z"/>"#, &params());
        assert!(metrics.score <= 100);
    }
}
