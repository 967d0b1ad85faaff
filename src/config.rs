//! Engine configuration from the environment and JSON scale files.
//!
//! | Variable | Meaning |
//! |---|---|
//! | `GRADE_SCALE` | preset name (`4.0`, `percentage`, `percentage-raw`) |
//! | `GRADE_SCALE_FILE` | JSON scale spec; wins over `GRADE_SCALE` |
//! | `PASSING_THRESHOLD` | GPA a student needs to pass |
//! | `PASSING_GRADE_POINT` | grade point a single record needs to pass |

use anyhow::{Context, Result};
use tracing::debug;

use crate::error::ConfigurationError;
use crate::scale::{GradeScale, ScalePreset, ScaleSpec, Thresholds};

pub const GRADE_SCALE: &str = "GRADE_SCALE";
pub const GRADE_SCALE_FILE: &str = "GRADE_SCALE_FILE";
pub const PASSING_THRESHOLD: &str = "PASSING_THRESHOLD";
pub const PASSING_GRADE_POINT: &str = "PASSING_GRADE_POINT";

/// Loads a scale spec from a JSON file at `path`.
///
/// ```json
/// {"preset": "4.0"}
/// ```
/// or explicit bands, see [`ScaleSpec`].
pub fn load_scale_spec(path: &str) -> Result<ScaleSpec> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read scale file {path}"))?;
    let spec: ScaleSpec = serde_json::from_str(&content)
        .with_context(|| format!("Invalid scale spec in {path}"))?;
    Ok(spec)
}

/// Unresolved settings. Thresholds left as `None` are derived from the
/// scale, see [`Thresholds::for_scale`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub scale: ScaleSpec,
    pub passing_gpa: Option<f64>,
    pub passing_grade_point: Option<f64>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            scale: ScalePreset::UsFourPoint.into(),
            passing_gpa: None,
            passing_grade_point: None,
        }
    }
}

impl AnalysisConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(GRADE_SCALE_FILE) {
            config.scale = load_scale_spec(&path)?;
            debug!(path, "Scale loaded from file");
        } else if let Some(name) = lookup(GRADE_SCALE) {
            let preset: ScalePreset = name
                .parse()
                .with_context(|| format!("{GRADE_SCALE}={name}"))?;
            config.scale = preset.into();
        }

        config.passing_gpa = parse_number(&lookup, PASSING_THRESHOLD)?;
        config.passing_grade_point = parse_number(&lookup, PASSING_GRADE_POINT)?;
        Ok(config)
    }

    pub fn with_scale(mut self, scale: ScaleSpec) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_passing_gpa(mut self, passing_gpa: f64) -> Self {
        self.passing_gpa = Some(passing_gpa);
        self
    }

    pub fn with_passing_grade_point(mut self, passing_grade_point: f64) -> Self {
        self.passing_grade_point = Some(passing_grade_point);
        self
    }

    /// Builds and validates the scale, then the thresholds against it.
    ///
    /// # Errors
    ///
    /// Any structural defect in the scale or a negative or non-finite
    /// threshold.
    pub fn resolve(&self) -> Result<(GradeScale, Thresholds), ConfigurationError> {
        let scale = self.scale.build()?;
        let defaults = Thresholds::for_scale(&scale);
        let thresholds = Thresholds::new(
            self.passing_gpa.unwrap_or(defaults.passing_gpa),
            self.passing_grade_point
                .unwrap_or(defaults.passing_grade_point),
        )?;
        Ok((scale, thresholds))
    }
}

fn parse_number<F>(lookup: &F, name: &str) -> Result<Option<f64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<f64>()
                .with_context(|| format!("{name}={raw} is not a number"))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn temp_path(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    #[test]
    fn test_defaults_to_four_point_scale() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[])).unwrap();
        let (scale, thresholds) = config.resolve().unwrap();
        assert_eq!(scale.name(), "4.0");
        assert_eq!(thresholds.passing_gpa, 2.0);
        assert_eq!(thresholds.passing_grade_point, 1.0);
    }

    #[test]
    fn test_preset_and_thresholds_from_env() {
        let config = AnalysisConfig::from_lookup(lookup_from(&[
            (GRADE_SCALE, "percentage-raw"),
            (PASSING_THRESHOLD, " 60 "),
        ]))
        .unwrap();
        let (scale, thresholds) = config.resolve().unwrap();
        assert_eq!(scale.max_grade_point(), 100.0);
        assert_eq!(thresholds.passing_gpa, 60.0);
        assert_eq!(thresholds.passing_grade_point, 45.0);
    }

    #[test]
    fn test_unknown_preset_is_an_error() {
        assert!(AnalysisConfig::from_lookup(lookup_from(&[(GRADE_SCALE, "7-point")])).is_err());
    }

    #[test]
    fn test_bad_threshold_is_an_error() {
        assert!(
            AnalysisConfig::from_lookup(lookup_from(&[(PASSING_THRESHOLD, "high")])).is_err()
        );
        let negative = AnalysisConfig::default().with_passing_gpa(-1.0);
        assert!(matches!(
            negative.resolve(),
            Err(ConfigurationError::InvalidThreshold { .. })
        ));
    }

    #[test]
    fn test_scale_file_takes_precedence() {
        let path = temp_path("grade_analytics_test_scale.json");
        fs::write(
            &path,
            r#"{"name": "pass-fail", "bands": [
                {"lower_bound": 50, "upper_bound": 100, "letter": "P", "grade_point": 1.0},
                {"lower_bound": 0, "upper_bound": 50, "letter": "F", "grade_point": 0.0}
            ]}"#,
        )
        .unwrap();

        let config = AnalysisConfig::from_lookup(lookup_from(&[
            (GRADE_SCALE_FILE, path.as_str()),
            (GRADE_SCALE, "percentage"),
        ]))
        .unwrap();
        let (scale, _) = config.resolve().unwrap();
        assert_eq!(scale.name(), "pass-fail");
        assert_eq!(scale.lookup(50.0).unwrap().letter, "P");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_scale_file_surfaces_configuration_error() {
        let path = temp_path("grade_analytics_test_gap.json");
        fs::write(
            &path,
            r#"{"bands": [
                {"lower_bound": 0, "upper_bound": 40, "letter": "F", "grade_point": 0.0},
                {"lower_bound": 50, "upper_bound": 100, "letter": "P", "grade_point": 1.0}
            ]}"#,
        )
        .unwrap();

        let config = AnalysisConfig::from_lookup(lookup_from(&[(GRADE_SCALE_FILE, path.as_str())]))
            .unwrap();
        assert!(matches!(config.resolve(), Err(ConfigurationError::Gap { .. })));

        fs::remove_file(&path).unwrap();
    }
}
