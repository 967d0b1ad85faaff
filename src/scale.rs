//! Grade scales: validated mark-range bands mapped to letters and grade points.
//!
//! A [`GradeScale`] is a sorted, gap-free, non-overlapping cover of
//! `[0, 100]`. Bands are half-open `[lower, upper)` except the highest one,
//! which is closed at 100. A mark sitting exactly on an internal boundary
//! therefore belongs to the upper band.
//!
//! | Preset (4.0)  | Marks       | Points |
//! |---------------|-------------|--------|
//! | A+            | [97, 100]   | 4.0    |
//! | A             | [93, 97)    | 4.0    |
//! | A-            | [90, 93)    | 3.7    |
//! | B+ / B / B-   | 87 / 83 / 80| 3.3 / 3.0 / 2.7 |
//! | C+ / C / C-   | 77 / 73 / 70| 2.3 / 2.0 / 1.7 |
//! | D+ / D        | 67 / 63     | 1.3 / 1.0 |
//! | F             | [0, 63)     | 0.0    |

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::cache::{Fingerprint, FingerprintBuilder};
use crate::error::{ConfigurationError, OutOfRangeError};

pub const MIN_MARKS: f64 = 0.0;
pub const MAX_MARKS: f64 = 100.0;

/// (lower bound, letter, grade point), ascending. Upper bounds are implied
/// by the next band's lower bound.
static US_FOUR_POINT: &[(f64, &str, f64)] = &[
    (0.0, "F", 0.0),
    (63.0, "D", 1.0),
    (67.0, "D+", 1.3),
    (70.0, "C-", 1.7),
    (73.0, "C", 2.0),
    (77.0, "C+", 2.3),
    (80.0, "B-", 2.7),
    (83.0, "B", 3.0),
    (87.0, "B+", 3.3),
    (90.0, "A-", 3.7),
    (93.0, "A", 4.0),
    (97.0, "A+", 4.0),
];

/// Letter cut-offs for the percentage scale. Grade points come from the
/// marks themselves, see [`PointMapping::Proportional`].
static PERCENTAGE_LETTERS: &[(f64, &str)] = &[
    (0.0, "F"),
    (45.0, "D"),
    (50.0, "D+"),
    (55.0, "C-"),
    (60.0, "C"),
    (65.0, "C+"),
    (70.0, "B-"),
    (75.0, "B"),
    (80.0, "B+"),
    (85.0, "A-"),
    (90.0, "A"),
    (95.0, "A+"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBand {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub letter: String,
    pub grade_point: f64,
}

impl GradeBand {
    pub fn new(lower_bound: f64, upper_bound: f64, letter: &str, grade_point: f64) -> Self {
        Self {
            lower_bound,
            upper_bound,
            letter: letter.to_string(),
            grade_point,
        }
    }

    /// The one place the boundary rule lives: `[lower, upper)`, or
    /// `[lower, upper]` for the topmost band.
    fn contains(&self, marks: f64, closed_top: bool) -> bool {
        marks >= self.lower_bound
            && (marks < self.upper_bound || (closed_top && marks <= self.upper_bound))
    }
}

/// How a matched band turns into a grade point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointMapping {
    /// Use the band's own `grade_point`.
    #[default]
    Band,
    /// `marks / 100 * scale_max`; the band only supplies the letter.
    Proportional { scale_max: f64 },
}

/// Result of a successful [`GradeScale::lookup`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grade<'a> {
    /// Index into [`GradeScale::bands`].
    pub band: usize,
    pub letter: &'a str,
    pub grade_point: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeScale {
    name: String,
    bands: Vec<GradeBand>,
    mapping: PointMapping,
}

impl GradeScale {
    /// Validates `bands` and builds a scale using band grade points.
    ///
    /// Bands may be given in any order; they are sorted by lower bound.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigurationError`] on gaps, overlaps, decreasing grade
    /// points, bounds outside `[0, 100]`, or non-finite values.
    pub fn build(bands: Vec<GradeBand>) -> Result<Self, ConfigurationError> {
        Self::build_with(ScalePreset::CUSTOM_NAME, bands, PointMapping::Band)
    }

    pub fn build_with(
        name: &str,
        mut bands: Vec<GradeBand>,
        mapping: PointMapping,
    ) -> Result<Self, ConfigurationError> {
        if bands.is_empty() {
            return Err(ConfigurationError::EmptyScale);
        }

        let mut letters = HashSet::new();
        for band in &bands {
            validate_band(band)?;
            if !letters.insert(band.letter.as_str()) {
                return Err(ConfigurationError::DuplicateLetter {
                    letter: band.letter.clone(),
                });
            }
        }

        if let PointMapping::Proportional { scale_max } = mapping {
            if !scale_max.is_finite() || scale_max <= 0.0 {
                return Err(ConfigurationError::InvalidScaleMax { value: scale_max });
            }
        }

        bands.sort_by(|a, b| a.lower_bound.total_cmp(&b.lower_bound));

        // Non-empty was checked above.
        let first = &bands[0];
        if first.lower_bound != MIN_MARKS {
            return Err(ConfigurationError::DoesNotStartAtZero {
                letter: first.letter.clone(),
                lower: first.lower_bound,
            });
        }
        let last = &bands[bands.len() - 1];
        if last.upper_bound != MAX_MARKS {
            return Err(ConfigurationError::DoesNotReachHundred {
                letter: last.letter.clone(),
                upper: last.upper_bound,
            });
        }

        for pair in bands.windows(2) {
            let (below, above) = (&pair[0], &pair[1]);
            if below.upper_bound < above.lower_bound {
                return Err(ConfigurationError::Gap {
                    below: below.letter.clone(),
                    above: above.letter.clone(),
                    upper: below.upper_bound,
                    lower: above.lower_bound,
                });
            }
            if below.upper_bound > above.lower_bound {
                return Err(ConfigurationError::Overlap {
                    below: below.letter.clone(),
                    above: above.letter.clone(),
                    upper: below.upper_bound,
                    lower: above.lower_bound,
                });
            }
            if below.grade_point > above.grade_point {
                return Err(ConfigurationError::ReversedPoints {
                    below: below.letter.clone(),
                    above: above.letter.clone(),
                    below_points: below.grade_point,
                    above_points: above.grade_point,
                });
            }
        }

        Ok(Self {
            name: name.to_string(),
            bands,
            mapping,
        })
    }

    /// The standard US 4.0 scale.
    pub fn us_four_point() -> Result<Self, ConfigurationError> {
        let bands = chain_bands(US_FOUR_POINT.iter().copied());
        Self::build_with(ScalePreset::UsFourPoint.name(), bands, PointMapping::Band)
    }

    /// Percentage letters with grade points `marks / 100 * 4`.
    pub fn percentage() -> Result<Self, ConfigurationError> {
        Self::percentage_with(ScalePreset::Percentage, 4.0)
    }

    /// Percentage letters with the marks passed through as grade points.
    pub fn percentage_pass_through() -> Result<Self, ConfigurationError> {
        Self::percentage_with(ScalePreset::PercentagePassThrough, MAX_MARKS)
    }

    fn percentage_with(preset: ScalePreset, scale_max: f64) -> Result<Self, ConfigurationError> {
        // Nominal band points are the lower bounds on the target scale so the
        // monotonicity check still applies.
        let bands = chain_bands(
            PERCENTAGE_LETTERS
                .iter()
                .map(|&(lower, letter)| (lower, letter, lower / MAX_MARKS * scale_max)),
        );
        Self::build_with(
            preset.name(),
            bands,
            PointMapping::Proportional { scale_max },
        )
    }

    /// Maps `marks` to its band's letter and grade point.
    ///
    /// # Errors
    ///
    /// Returns [`OutOfRangeError`] if `marks` is non-finite or outside
    /// `[0, 100]`.
    pub fn lookup(&self, marks: f64) -> Result<Grade<'_>, OutOfRangeError> {
        if !marks.is_finite() || !(MIN_MARKS..=MAX_MARKS).contains(&marks) {
            return Err(OutOfRangeError { marks });
        }

        let index = self
            .bands
            .partition_point(|b| b.lower_bound <= marks)
            .saturating_sub(1);
        let band = &self.bands[index];
        if !band.contains(marks, index + 1 == self.bands.len()) {
            return Err(OutOfRangeError { marks });
        }

        Ok(Grade {
            band: index,
            letter: &band.letter,
            grade_point: self.points_for(band, marks),
        })
    }

    fn points_for(&self, band: &GradeBand, marks: f64) -> f64 {
        match self.mapping {
            PointMapping::Band => band.grade_point,
            PointMapping::Proportional { scale_max } => marks / MAX_MARKS * scale_max,
        }
    }

    /// Grade point earned at the bottom of the lowest passing band, the one
    /// directly above the failing band. A single-band scale passes every mark.
    pub fn passing_grade_point(&self) -> f64 {
        self.bands
            .get(1)
            .or(self.bands.first())
            .map_or(0.0, |band| self.points_for(band, band.lower_bound))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bands in ascending mark order.
    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    pub fn mapping(&self) -> PointMapping {
        self.mapping
    }

    /// The highest grade point this scale can award.
    pub fn max_grade_point(&self) -> f64 {
        match self.mapping {
            PointMapping::Band => self
                .bands
                .iter()
                .map(|b| b.grade_point)
                .fold(0.0, f64::max),
            PointMapping::Proportional { scale_max } => scale_max,
        }
    }

    /// Content fingerprint of bands and point mapping. The display name
    /// does not contribute.
    pub fn fingerprint(&self) -> Fingerprint {
        let mut hasher = FingerprintBuilder::new("grade_scale");
        hasher.u64(self.bands.len() as u64);
        for band in &self.bands {
            hasher
                .f64(band.lower_bound)
                .f64(band.upper_bound)
                .str(&band.letter)
                .f64(band.grade_point);
        }
        match self.mapping {
            PointMapping::Band => hasher.str("band"),
            PointMapping::Proportional { scale_max } => hasher.str("proportional").f64(scale_max),
        };
        hasher.finish()
    }
}

fn validate_band(band: &GradeBand) -> Result<(), ConfigurationError> {
    if !band.lower_bound.is_finite() || !band.upper_bound.is_finite() {
        return Err(ConfigurationError::NonFiniteBound {
            letter: band.letter.clone(),
        });
    }
    if !band.grade_point.is_finite() {
        return Err(ConfigurationError::NonFiniteGradePoint {
            letter: band.letter.clone(),
        });
    }
    if band.lower_bound < MIN_MARKS || band.upper_bound > MAX_MARKS {
        return Err(ConfigurationError::BoundsOutOfRange {
            letter: band.letter.clone(),
            lower: band.lower_bound,
            upper: band.upper_bound,
        });
    }
    if band.lower_bound >= band.upper_bound {
        return Err(ConfigurationError::EmptyBand {
            letter: band.letter.clone(),
            lower: band.lower_bound,
            upper: band.upper_bound,
        });
    }
    Ok(())
}

/// Turns ascending (lower, letter, points) rows into bands whose upper bound
/// is the next row's lower bound, closing the last one at 100.
fn chain_bands<'a>(rows: impl Iterator<Item = (f64, &'a str, f64)>) -> Vec<GradeBand> {
    let rows: Vec<_> = rows.collect();
    rows.iter()
        .enumerate()
        .map(|(i, &(lower, letter, points))| {
            let upper = rows.get(i + 1).map_or(MAX_MARKS, |next| next.0);
            GradeBand::new(lower, upper, letter, points)
        })
        .collect()
}

/// Built-in scales selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ScalePreset {
    UsFourPoint,
    Percentage,
    PercentagePassThrough,
}

impl ScalePreset {
    const CUSTOM_NAME: &'static str = "custom";

    pub fn name(self) -> &'static str {
        match self {
            ScalePreset::UsFourPoint => "4.0",
            ScalePreset::Percentage => "percentage",
            ScalePreset::PercentagePassThrough => "percentage-raw",
        }
    }

    pub fn build(self) -> Result<GradeScale, ConfigurationError> {
        match self {
            ScalePreset::UsFourPoint => GradeScale::us_four_point(),
            ScalePreset::Percentage => GradeScale::percentage(),
            ScalePreset::PercentagePassThrough => GradeScale::percentage_pass_through(),
        }
    }
}

impl FromStr for ScalePreset {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4.0" | "4" | "us" | "us-4.0" => Ok(ScalePreset::UsFourPoint),
            "100" | "percentage" => Ok(ScalePreset::Percentage),
            "100-raw" | "percentage-raw" | "pass-through" => {
                Ok(ScalePreset::PercentagePassThrough)
            }
            other => Err(ConfigurationError::UnknownPreset {
                name: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ScalePreset {
    type Error = ConfigurationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ScalePreset> for String {
    fn from(preset: ScalePreset) -> Self {
        preset.name().to_string()
    }
}

impl fmt::Display for ScalePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A scale as written in configuration: a preset name or explicit bands.
///
/// ```json
/// {"preset": "percentage"}
/// {"bands": [{"lower_bound": 0, "upper_bound": 100, "letter": "P", "grade_point": 1.0}]}
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawScaleSpec")]
pub enum ScaleSpec {
    Preset {
        preset: ScalePreset,
    },
    Bands {
        name: Option<String>,
        bands: Vec<GradeBand>,
        point_mapping: PointMapping,
    },
}

/// Wire shape of [`ScaleSpec`]. Preset names are parsed after the shape is
/// known so an unknown name reports [`ConfigurationError::UnknownPreset`].
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScaleSpec {
    preset: Option<String>,
    name: Option<String>,
    bands: Option<Vec<GradeBand>>,
    #[serde(default)]
    point_mapping: PointMapping,
}

impl TryFrom<RawScaleSpec> for ScaleSpec {
    type Error = ConfigurationError;

    fn try_from(raw: RawScaleSpec) -> Result<Self, Self::Error> {
        match (raw.preset, raw.bands) {
            (Some(preset), None) => Ok(ScaleSpec::Preset {
                preset: preset.parse()?,
            }),
            (None, Some(bands)) => Ok(ScaleSpec::Bands {
                name: raw.name,
                bands,
                point_mapping: raw.point_mapping,
            }),
            _ => Err(ConfigurationError::MalformedScaleSpec),
        }
    }
}

impl ScaleSpec {
    pub fn build(&self) -> Result<GradeScale, ConfigurationError> {
        match self {
            ScaleSpec::Preset { preset } => preset.build(),
            ScaleSpec::Bands {
                name,
                bands,
                point_mapping,
            } => GradeScale::build_with(
                name.as_deref().unwrap_or(ScalePreset::CUSTOM_NAME),
                bands.clone(),
                *point_mapping,
            ),
        }
    }
}

impl From<ScalePreset> for ScaleSpec {
    fn from(preset: ScalePreset) -> Self {
        ScaleSpec::Preset { preset }
    }
}

/// Pass cut-offs used by the aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    /// A student passes when their GPA is at or above this.
    pub passing_gpa: f64,
    /// A single course record passes at or above this grade point.
    pub passing_grade_point: f64,
}

impl Thresholds {
    pub fn new(passing_gpa: f64, passing_grade_point: f64) -> Result<Self, ConfigurationError> {
        for (name, value) in [
            ("passing_gpa", passing_gpa),
            ("passing_grade_point", passing_grade_point),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigurationError::InvalidThreshold {
                    name: name.into(),
                    value,
                });
            }
        }
        Ok(Self {
            passing_gpa,
            passing_grade_point,
        })
    }

    /// Defaults derived from `scale`: half the maximum grade point for a
    /// passing GPA (2.0 of 4.0), and per record the grade point of the
    /// lowest passing letter ("D": 1.0 on 4.0, 45 marks on percentage).
    pub fn for_scale(scale: &GradeScale) -> Self {
        Self {
            passing_gpa: scale.max_grade_point() * 0.5,
            passing_grade_point: scale.passing_grade_point(),
        }
    }

    pub(crate) fn feed(&self, hasher: &mut FingerprintBuilder) {
        hasher.f64(self.passing_gpa).f64(self.passing_grade_point);
    }
}
