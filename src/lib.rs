pub mod config;
pub mod detection;
pub mod discovery;
pub mod errors;
pub mod labels;
pub mod logging;
pub mod matcher;
pub mod model;
pub mod traits;

pub mod mocks;

use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::path::Path;

pub use config::{Cli, Settings, TargetLabels};
pub use detection::{BoundingBox, Detection, DetectionResult};
pub use errors::{Result, SearchError};
pub use labels::LabelTable;
pub use matcher::{ImageMatch, LabelMatcher, MatchSet};
pub use model::YoloModel;
pub use traits::*;

/// Counts for one directory search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchSummary {
    pub scanned: usize,
    pub matched: usize,
    pub failed: usize,
}

/// Runs a detection model over a directory and reports images with target labels.
pub struct Searcher<M: ObjectDetectionModel> {
    model: M,
    settings: Settings,
    matcher: LabelMatcher,
}

impl<M: ObjectDetectionModel> Searcher<M> {
    pub fn new(model: M, settings: Settings) -> Self {
        let matcher = LabelMatcher::new(settings.labels.clone());
        Self {
            model,
            settings,
            matcher,
        }
    }

    pub const fn model(&self) -> &M {
        &self.model
    }

    pub const fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Detect and match a single image.
    ///
    /// Returns `Ok(None)` when the model has no result or nothing matched.
    /// Model failures are returned to the caller.
    pub fn search_image(&self, path: &Path) -> Result<Option<ImageMatch>> {
        let Some(result) = self.model.detect(path)? else {
            tracing::debug!("No result for {}", path.display());
            return Ok(None);
        };

        let labels = self.matcher.match_labels(&result, &self.model);
        if labels.is_empty() {
            return Ok(None);
        }

        Ok(Some(ImageMatch {
            path: path.to_path_buf(),
            labels,
        }))
    }

    /// Search every image under `root`, writing one line per match to `out`.
    ///
    /// The root is checked before any image is processed. A detection failure
    /// on one image is reported on stderr and the search moves on.
    pub fn search_directory<W: Write>(&self, root: &Path, out: &mut W) -> Result<SearchSummary> {
        let images = discovery::find_images(root, self.settings.recursive)?;

        let progress = ProgressBar::new_spinner();
        progress.set_style(
            ProgressStyle::with_template("{spinner:.green} [{elapsed}] {pos} images {wide_msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );

        let mut summary = SearchSummary::default();
        for entry in images {
            let path = match entry {
                Ok(path) => path,
                Err(err) => {
                    progress.suspend(|| tracing::warn!("Skipping unreadable entry: {err}"));
                    continue;
                }
            };
            progress.set_message(path.display().to_string());
            summary.scanned += 1;

            match self.search_image(&path) {
                Ok(Some(image_match)) => {
                    summary.matched += 1;
                    progress
                        .suspend(|| writeln!(out, "{image_match}"))
                        .map_err(|source| SearchError::Io {
                            path: path.clone(),
                            operation: "writing match".to_string(),
                            source,
                        })?;
                }
                Ok(None) => {}
                Err(err @ SearchError::Detection { .. }) => {
                    summary.failed += 1;
                    progress.suspend(|| eprintln!("Error processing {}: {err}", path.display()));
                }
                Err(err) => {
                    progress.finish_and_clear();
                    return Err(err);
                }
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        tracing::info!(
            "Scanned {} images under {}: {} matched, {} failed",
            summary.scanned,
            root.display(),
            summary.matched,
            summary.failed
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{MockDetectionModel, MockOutcome};
    use std::fs;
    use tempfile::TempDir;

    fn settings(labels: &str, recursive: bool) -> Settings {
        Settings {
            model: "unused.onnx".to_string(),
            labels: TargetLabels::parse(labels),
            confidence_threshold: 0.25,
            recursive,
        }
    }

    fn model() -> MockDetectionModel {
        MockDetectionModel::new(LabelTable::from_sequence(["Cat", "Dog", "person"]))
    }

    #[test]
    fn test_search_image_sorts_and_dedups() -> Result<()> {
        let searcher = Searcher::new(
            model().with_class_ids("pets.jpg", &[1, 0, 0, 2]),
            settings("cat,dog", false),
        );

        let image_match = searcher.search_image(Path::new("pets.jpg"))?.unwrap();

        assert_eq!(image_match.to_string(), "pets.jpg: Cat, Dog");
        Ok(())
    }

    #[test]
    fn test_search_image_without_result() -> Result<()> {
        let searcher = Searcher::new(
            model().with_outcome("blank.jpg", MockOutcome::NoResult),
            settings("cat", false),
        );

        assert_eq!(searcher.search_image(Path::new("blank.jpg"))?, None);
        Ok(())
    }

    #[test]
    fn test_search_image_propagates_model_failure() {
        let searcher = Searcher::new(
            model().with_outcome("broken.jpg", MockOutcome::Fail("corrupt".into())),
            settings("cat", false),
        );

        let err = searcher.search_image(Path::new("broken.jpg")).unwrap_err();
        assert!(matches!(err, SearchError::Detection { .. }));
    }

    #[test]
    fn test_search_directory_rejects_missing_root() {
        let temp_dir = TempDir::new().unwrap();
        let searcher = Searcher::new(model(), settings("cat", true));
        let mut out: Vec<u8> = Vec::new();

        let err = searcher
            .search_directory(&temp_dir.path().join("missing"), &mut out)
            .unwrap_err();

        assert!(matches!(err, SearchError::InvalidSearchPath { .. }));
        assert!(searcher.model().calls().is_empty());
        assert!(out.is_empty());
    }

    #[test]
    fn test_search_directory_counts() -> Result<()> {
        let temp_dir = TempDir::new().unwrap();
        for name in ["cat.jpg", "broken.png", "empty.webp"] {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }
        let searcher = Searcher::new(
            model()
                .with_class_ids("cat.jpg", &[0])
                .with_outcome("broken.png", MockOutcome::Fail("corrupt".into())),
            settings("cat", false),
        );
        let mut out: Vec<u8> = Vec::new();

        let summary = searcher.search_directory(temp_dir.path(), &mut out)?;

        assert_eq!(
            summary,
            SearchSummary {
                scanned: 3,
                matched: 1,
                failed: 1
            }
        );
        let stdout = String::from_utf8(out).unwrap();
        assert_eq!(stdout.lines().count(), 1);
        assert!(stdout.ends_with("cat.jpg: Cat\n"));
        Ok(())
    }
}
