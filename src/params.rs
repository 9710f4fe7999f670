//! Parameter Derivation - Digest Bits to Design Knobs
//!
//! A fixed table slices the digest into named fields. Each entry reads
//! `ceil(width / 4) + 1` hex characters starting at `floor(offset / 4)`,
//! reduces the value modulo `2^width`, normalizes it to `[0, 1]` and maps it
//! into the field's declared range (or picks an enum variant by index).
//!
//! The table is part of the contract with the shape generators: field set,
//! offsets and ranges must not drift.

use serde::{Deserialize, Serialize};

use crate::hashing::{Digest, DIGEST_HEX_LEN};

use FieldKind::{Choice, Continuous, Count};

/// How a field's normalized value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Float in `[min, max]`.
    Continuous,
    /// Integer count in `[min, max]`, rounded.
    Count,
    /// Index into an enumeration of the given size.
    Choice(u32),
}

/// One row of the derivation table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub bit_offset: u32,
    pub bit_width: u32,
    pub min: f64,
    pub max: f64,
    pub kind: FieldKind,
}

impl FieldSpec {
    const fn new(
        name: &'static str,
        bit_offset: u32,
        bit_width: u32,
        min: f64,
        max: f64,
        kind: FieldKind,
    ) -> Self {
        Self { name, bit_offset, bit_width, min, max, kind }
    }

    /// Hex window `[start, end)` this field reads.
    pub fn hex_window(&self) -> (usize, usize) {
        let start = (self.bit_offset / 4) as usize;
        let len = self.bit_width.div_ceil(4) as usize + 1;
        (start, start + len)
    }

    /// Raw integer for this field, already reduced modulo `2^width`.
    fn extract(&self, digest: &Digest) -> u64 {
        let (start, end) = self.hex_window();
        let hex = &digest.as_str()[start..end.min(DIGEST_HEX_LEN)];
        let raw = u64::from_str_radix(hex, 16).unwrap_or(0);
        raw & self.mask()
    }

    fn mask(&self) -> u64 {
        (1u64 << self.bit_width) - 1
    }

    fn normalize(&self, raw: u64) -> f64 {
        raw as f64 / self.mask() as f64
    }

    fn continuous(&self, digest: &Digest) -> f64 {
        let t = self.normalize(self.extract(digest));
        (self.min + t * (self.max - self.min)).clamp(self.min, self.max)
    }

    fn count(&self, digest: &Digest) -> u32 {
        self.continuous(digest).round() as u32
    }

    fn choice(&self, digest: &Digest) -> u32 {
        match self.kind {
            FieldKind::Choice(size) => (self.extract(digest) % u64::from(size.max(1))) as u32,
            _ => 0,
        }
    }
}

/// Every derived field, in table order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamField {
    ElementCount,
    LayerCount,
    PointCount,
    Symmetry,
    StyleVariant,
    ColorPlacement,
    RotationOffset,
    AngularSpread,
    TwistAngle,
    CurveTension,
    WaveAmplitude,
    WaveFrequency,
    ScaleFactor,
    SpacingRatio,
    InnerRadiusRatio,
    TaperRatio,
    StrokeWeight,
    SpiralTightness,
    OrganicVariance,
    ArmWidth,
    ExtrusionDepth,
    CornerRadius,
    AspectStretch,
    PetalRoundness,
    HelixPitch,
    PeakHeight,
    HeadRatio,
    NotchDepth,
    GapRatio,
    OrbitEccentricity,
    FoldOffset,
}

static FIELD_TABLE: [FieldSpec; 31] = [
    FieldSpec::new("elementCount", 0, 4, 3.0, 12.0, Count),
    FieldSpec::new("layerCount", 4, 4, 1.0, 5.0, Count),
    FieldSpec::new("pointCount", 8, 4, 3.0, 8.0, Count),
    FieldSpec::new("symmetry", 12, 4, 0.0, 3.0, Choice(Symmetry::COUNT)),
    FieldSpec::new("styleVariant", 16, 4, 0.0, 4.0, Choice(StyleVariant::COUNT)),
    FieldSpec::new("colorPlacement", 20, 4, 0.0, 3.0, Choice(4)),
    FieldSpec::new("rotationOffset", 24, 12, 0.0, 360.0, Continuous),
    FieldSpec::new("angularSpread", 36, 8, 30.0, 360.0, Continuous),
    FieldSpec::new("twistAngle", 44, 12, -45.0, 45.0, Continuous),
    FieldSpec::new("curveTension", 56, 8, 0.2, 0.9, Continuous),
    FieldSpec::new("waveAmplitude", 64, 8, 0.05, 0.35, Continuous),
    FieldSpec::new("waveFrequency", 72, 8, 1.0, 6.0, Continuous),
    FieldSpec::new("scaleFactor", 80, 8, 0.6, 1.0, Continuous),
    FieldSpec::new("spacingRatio", 88, 8, 0.1, 0.5, Continuous),
    FieldSpec::new("innerRadiusRatio", 96, 8, 0.2, 0.7, Continuous),
    FieldSpec::new("taperRatio", 104, 8, 0.3, 1.0, Continuous),
    FieldSpec::new("strokeWeight", 112, 8, 1.5, 6.0, Continuous),
    FieldSpec::new("spiralTightness", 120, 8, 0.1, 1.0, Continuous),
    FieldSpec::new("organicVariance", 128, 8, 0.0, 0.4, Continuous),
    FieldSpec::new("armWidth", 136, 8, 0.05, 0.3, Continuous),
    FieldSpec::new("extrusionDepth", 144, 8, 0.0, 0.5, Continuous),
    FieldSpec::new("cornerRadius", 152, 8, 0.0, 0.3, Continuous),
    FieldSpec::new("aspectStretch", 160, 8, 0.8, 1.25, Continuous),
    FieldSpec::new("petalRoundness", 168, 8, 0.2, 1.0, Continuous),
    FieldSpec::new("helixPitch", 176, 8, 0.1, 0.6, Continuous),
    FieldSpec::new("peakHeight", 184, 8, 0.2, 0.8, Continuous),
    FieldSpec::new("headRatio", 192, 8, 0.2, 0.5, Continuous),
    FieldSpec::new("notchDepth", 200, 8, 0.0, 0.3, Continuous),
    FieldSpec::new("gapRatio", 208, 8, 0.02, 0.15, Continuous),
    FieldSpec::new("orbitEccentricity", 216, 8, 0.0, 0.6, Continuous),
    FieldSpec::new("foldOffset", 224, 8, -0.2, 0.2, Continuous),
];

impl ParamField {
    pub const ALL: [ParamField; 31] = [
        ParamField::ElementCount,
        ParamField::LayerCount,
        ParamField::PointCount,
        ParamField::Symmetry,
        ParamField::StyleVariant,
        ParamField::ColorPlacement,
        ParamField::RotationOffset,
        ParamField::AngularSpread,
        ParamField::TwistAngle,
        ParamField::CurveTension,
        ParamField::WaveAmplitude,
        ParamField::WaveFrequency,
        ParamField::ScaleFactor,
        ParamField::SpacingRatio,
        ParamField::InnerRadiusRatio,
        ParamField::TaperRatio,
        ParamField::StrokeWeight,
        ParamField::SpiralTightness,
        ParamField::OrganicVariance,
        ParamField::ArmWidth,
        ParamField::ExtrusionDepth,
        ParamField::CornerRadius,
        ParamField::AspectStretch,
        ParamField::PetalRoundness,
        ParamField::HelixPitch,
        ParamField::PeakHeight,
        ParamField::HeadRatio,
        ParamField::NotchDepth,
        ParamField::GapRatio,
        ParamField::OrbitEccentricity,
        ParamField::FoldOffset,
    ];

    pub fn spec(self) -> &'static FieldSpec {
        &FIELD_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.spec().name
    }
}

/// Symmetry applied by the shape generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Symmetry {
    Asymmetric,
    Bilateral,
    Radial,
    Rotational,
}

impl Symmetry {
    pub const COUNT: u32 = 4;

    pub fn from_index(index: u32) -> Self {
        match index % Self::COUNT {
            0 => Symmetry::Asymmetric,
            1 => Symmetry::Bilateral,
            2 => Symmetry::Radial,
            _ => Symmetry::Rotational,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleVariant {
    Geometric,
    Organic,
    Minimal,
    Bold,
    Layered,
}

impl StyleVariant {
    pub const COUNT: u32 = 5;

    pub fn from_index(index: u32) -> Self {
        match index % Self::COUNT {
            0 => StyleVariant::Geometric,
            1 => StyleVariant::Organic,
            2 => StyleVariant::Minimal,
            3 => StyleVariant::Bold,
            _ => StyleVariant::Layered,
        }
    }

    pub fn index(self) -> u32 {
        self as u32
    }
}

/// Design parameters derived from one digest. A pure function of the digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedParameters {
    pub element_count: u32,
    pub layer_count: u32,
    pub point_count: u32,
    pub symmetry: Symmetry,
    pub style_variant: StyleVariant,
    pub color_placement: u32,
    /// Degrees.
    pub rotation_offset: f64,
    /// Degrees.
    pub angular_spread: f64,
    /// Degrees.
    pub twist_angle: f64,
    pub curve_tension: f64,
    pub wave_amplitude: f64,
    pub wave_frequency: f64,
    pub scale_factor: f64,
    pub spacing_ratio: f64,
    pub inner_radius_ratio: f64,
    pub taper_ratio: f64,
    pub stroke_weight: f64,
    pub spiral_tightness: f64,
    pub organic_variance: f64,
    pub arm_width: f64,
    pub extrusion_depth: f64,
    pub corner_radius: f64,
    pub aspect_stretch: f64,
    pub petal_roundness: f64,
    pub helix_pitch: f64,
    pub peak_height: f64,
    pub head_ratio: f64,
    pub notch_depth: f64,
    pub gap_ratio: f64,
    pub orbit_eccentricity: f64,
    pub fold_offset: f64,
}

impl DerivedParameters {
    pub fn from_digest(digest: &Digest) -> Self {
        let f = |field: ParamField| field.spec().continuous(digest);
        let n = |field: ParamField| field.spec().count(digest);
        let pick = |field: ParamField| field.spec().choice(digest);

        Self {
            element_count: n(ParamField::ElementCount),
            layer_count: n(ParamField::LayerCount),
            point_count: n(ParamField::PointCount),
            symmetry: Symmetry::from_index(pick(ParamField::Symmetry)),
            style_variant: StyleVariant::from_index(pick(ParamField::StyleVariant)),
            color_placement: pick(ParamField::ColorPlacement),
            rotation_offset: f(ParamField::RotationOffset),
            angular_spread: f(ParamField::AngularSpread),
            twist_angle: f(ParamField::TwistAngle),
            curve_tension: f(ParamField::CurveTension),
            wave_amplitude: f(ParamField::WaveAmplitude),
            wave_frequency: f(ParamField::WaveFrequency),
            scale_factor: f(ParamField::ScaleFactor),
            spacing_ratio: f(ParamField::SpacingRatio),
            inner_radius_ratio: f(ParamField::InnerRadiusRatio),
            taper_ratio: f(ParamField::TaperRatio),
            stroke_weight: f(ParamField::StrokeWeight),
            spiral_tightness: f(ParamField::SpiralTightness),
            organic_variance: f(ParamField::OrganicVariance),
            arm_width: f(ParamField::ArmWidth),
            extrusion_depth: f(ParamField::ExtrusionDepth),
            corner_radius: f(ParamField::CornerRadius),
            aspect_stretch: f(ParamField::AspectStretch),
            petal_roundness: f(ParamField::PetalRoundness),
            helix_pitch: f(ParamField::HelixPitch),
            peak_height: f(ParamField::PeakHeight),
            head_ratio: f(ParamField::HeadRatio),
            notch_depth: f(ParamField::NotchDepth),
            gap_ratio: f(ParamField::GapRatio),
            orbit_eccentricity: f(ParamField::OrbitEccentricity),
            fold_offset: f(ParamField::FoldOffset),
        }
    }

    /// Any field as `f64`; enums report their variant index.
    pub fn value(&self, field: ParamField) -> f64 {
        match field {
            ParamField::ElementCount => f64::from(self.element_count),
            ParamField::LayerCount => f64::from(self.layer_count),
            ParamField::PointCount => f64::from(self.point_count),
            ParamField::Symmetry => f64::from(self.symmetry.index()),
            ParamField::StyleVariant => f64::from(self.style_variant.index()),
            ParamField::ColorPlacement => f64::from(self.color_placement),
            ParamField::RotationOffset => self.rotation_offset,
            ParamField::AngularSpread => self.angular_spread,
            ParamField::TwistAngle => self.twist_angle,
            ParamField::CurveTension => self.curve_tension,
            ParamField::WaveAmplitude => self.wave_amplitude,
            ParamField::WaveFrequency => self.wave_frequency,
            ParamField::ScaleFactor => self.scale_factor,
            ParamField::SpacingRatio => self.spacing_ratio,
            ParamField::InnerRadiusRatio => self.inner_radius_ratio,
            ParamField::TaperRatio => self.taper_ratio,
            ParamField::StrokeWeight => self.stroke_weight,
            ParamField::SpiralTightness => self.spiral_tightness,
            ParamField::OrganicVariance => self.organic_variance,
            ParamField::ArmWidth => self.arm_width,
            ParamField::ExtrusionDepth => self.extrusion_depth,
            ParamField::CornerRadius => self.corner_radius,
            ParamField::AspectStretch => self.aspect_stretch,
            ParamField::PetalRoundness => self.petal_roundness,
            ParamField::HelixPitch => self.helix_pitch,
            ParamField::PeakHeight => self.peak_height,
            ParamField::HeadRatio => self.head_ratio,
            ParamField::NotchDepth => self.notch_depth,
            ParamField::GapRatio => self.gap_ratio,
            ParamField::OrbitEccentricity => self.orbit_eccentricity,
            ParamField::FoldOffset => self.fold_offset,
        }
    }
}

/// Derive the full parameter record from a digest. Total: never fails.
pub fn derive_parameters(digest: &Digest) -> DerivedParameters {
    DerivedParameters::from_digest(digest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn digest_of(fill: char) -> Digest {
        Digest::from_hex(&fill.to_string().repeat(64)).unwrap()
    }

    #[test]
    fn test_table_order_matches_enum() {
        for (i, field) in ParamField::ALL.iter().enumerate() {
            assert_eq!(*field as usize, i);
            assert_eq!(field.spec().name, FIELD_TABLE[i].name);
        }
    }

    #[test]
    fn test_table_reads_stay_inside_digest() {
        for field in ParamField::ALL {
            let (_, end) = field.spec().hex_window();
            assert!(end <= DIGEST_HEX_LEN, "{} reads past the digest", field.name());
            assert!(field.spec().bit_width <= 32);
        }
    }

    #[test]
    fn test_all_zero_digest_hits_minimums() {
        let params = derive_parameters(&digest_of('0'));
        assert_eq!(params.element_count, 3);
        assert_eq!(params.layer_count, 1);
        assert_eq!(params.symmetry, Symmetry::Asymmetric);
        assert_eq!(params.rotation_offset, 0.0);
        assert_eq!(params.fold_offset, -0.2);
    }

    #[test]
    fn test_all_ones_digest_hits_maximums() {
        let params = derive_parameters(&digest_of('f'));
        assert_eq!(params.element_count, 12);
        assert_eq!(params.layer_count, 5);
        assert_eq!(params.point_count, 8);
        assert_eq!(params.rotation_offset, 360.0);
        assert_eq!(params.curve_tension, 0.9);
        // 15 % 4 and 15 % 5
        assert_eq!(params.symmetry, Symmetry::Rotational);
        assert_eq!(params.style_variant, StyleVariant::Geometric);
    }

    #[test]
    fn test_value_roundtrips_named_fields() {
        let params = derive_parameters(&digest_of('7'));
        assert_eq!(params.value(ParamField::TaperRatio), params.taper_ratio);
        assert_eq!(
            params.value(ParamField::StyleVariant),
            f64::from(params.style_variant.index())
        );
    }

    #[test]
    fn test_serializes_camel_case() {
        let params = derive_parameters(&digest_of('a'));
        let json = serde_json::to_value(&params).unwrap();
        assert!(json.get("elementCount").is_some());
        assert!(json.get("orbitEccentricity").is_some());
        assert_eq!(json["symmetry"], "radial");
    }
}
