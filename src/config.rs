use clap::Parser;
use std::collections::HashSet;
use std::path::PathBuf;

use crate::errors::{Result, SearchError};

pub const DEFAULT_MODEL: &str = "yolov8n.pt";
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.25;

/// Search directory images with YOLO for configured labels.
///
/// Settings are read from the environment (a `.env` file in the working
/// directory is loaded first): `YOLO_MODEL`, `YOLO_LABELS`,
/// `CONFIDENCE_THRESHOLD` and `RECURSIVE`.
#[derive(Parser, Clone, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Directory path to search
    pub path: PathBuf,
}

/// Run settings, built once at start-up and read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Model identifier or path handed to the model loader.
    pub model: String,
    pub labels: TargetLabels,
    pub confidence_threshold: f32,
    pub recursive: bool,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let labels = TargetLabels::parse(&lookup("YOLO_LABELS").unwrap_or_default());
        if labels.is_empty() {
            return Err(SearchError::configuration(
                "YOLO_LABELS not configured. Set YOLO_LABELS in .env (comma-separated).",
            ));
        }

        let model = lookup("YOLO_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let confidence_threshold = match lookup("CONFIDENCE_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_CONFIDENCE_THRESHOLD,
        };
        let recursive = lookup("RECURSIVE").map_or(true, |raw| is_truthy(&raw));

        Ok(Self {
            model,
            labels,
            confidence_threshold,
            recursive,
        })
    }
}

/// Case-insensitive set of labels to search for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetLabels(HashSet<String>);

impl TargetLabels {
    /// Parse a comma-separated list, trimming entries and dropping empty ones.
    pub fn parse(raw: &str) -> Self {
        raw.split(',')
            .map(str::trim)
            .filter(|label| !label.is_empty())
            .collect()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(&label.to_lowercase())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl<S: AsRef<str>> FromIterator<S> for TargetLabels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|label| label.as_ref().to_lowercase())
                .collect(),
        )
    }
}

fn parse_threshold(raw: &str) -> Result<f32> {
    let value: f32 = raw.trim().parse().map_err(|_| {
        SearchError::configuration(format!("CONFIDENCE_THRESHOLD is not a number: {raw:?}"))
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(SearchError::configuration(format!(
            "CONFIDENCE_THRESHOLD must be between 0 and 1, got {value}"
        )));
    }
    Ok(value)
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.to_lowercase().as_str(), "1" | "true" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_from(pairs: &[(&str, &str)]) -> Result<Settings> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_defaults() -> Result<()> {
        let settings = settings_from(&[("YOLO_LABELS", "cat")])?;

        assert_eq!(settings.model, "yolov8n.pt");
        assert_eq!(settings.confidence_threshold, 0.25);
        assert!(settings.recursive);
        Ok(())
    }

    #[test]
    fn test_labels_are_trimmed_and_lowercased() -> Result<()> {
        let settings = settings_from(&[("YOLO_LABELS", " Cat, ,DOG ,, traffic light")])?;

        assert_eq!(settings.labels.len(), 3);
        assert!(settings.labels.contains("cat"));
        assert!(settings.labels.contains("Dog"));
        assert!(settings.labels.contains("Traffic Light"));
        assert!(!settings.labels.contains("person"));
        Ok(())
    }

    #[test]
    fn test_missing_labels_is_configuration_error() {
        for pairs in [vec![], vec![("YOLO_LABELS", "")], vec![("YOLO_LABELS", " , ,")]] {
            let err = settings_from(&pairs).unwrap_err();
            assert!(matches!(err, SearchError::Configuration { .. }));
            assert_eq!(err.exit_code(), 2);
        }
    }

    #[test]
    fn test_recursive_flag() -> Result<()> {
        let cases = [
            ("1", true),
            ("true", true),
            ("TRUE", true),
            ("Yes", true),
            ("false", false),
            ("0", false),
            ("no", false),
            ("", false),
        ];
        for (raw, expected) in cases {
            let settings = settings_from(&[("YOLO_LABELS", "cat"), ("RECURSIVE", raw)])?;
            assert_eq!(settings.recursive, expected, "RECURSIVE={raw:?}");
        }
        Ok(())
    }

    #[test]
    fn test_confidence_threshold() -> Result<()> {
        let settings = settings_from(&[("YOLO_LABELS", "cat"), ("CONFIDENCE_THRESHOLD", "0.5")])?;
        assert_eq!(settings.confidence_threshold, 0.5);

        for raw in ["abc", "1.5", "-0.1"] {
            let err = settings_from(&[("YOLO_LABELS", "cat"), ("CONFIDENCE_THRESHOLD", raw)])
                .unwrap_err();
            assert!(matches!(err, SearchError::Configuration { .. }), "{raw}");
        }
        Ok(())
    }

    #[test]
    fn test_model_override() -> Result<()> {
        let settings = settings_from(&[("YOLO_LABELS", "cat"), ("YOLO_MODEL", "models/x.onnx")])?;
        assert_eq!(settings.model, "models/x.onnx");
        Ok(())
    }

    #[test]
    fn test_cli_takes_one_positional_path() {
        let cli = Cli::try_parse_from(["yolo-search", "photos"]).unwrap();
        assert_eq!(cli.path, PathBuf::from("photos"));

        assert!(Cli::try_parse_from(["yolo-search"]).is_err());
    }
}
