//! Task identifiers and output classification.
//!
//! Every inference call is addressed by a prompt tag such as `<OD>` or
//! `<CAPTION>`. The set of tags is closed: anything outside it fails at the
//! parse boundary with [`AnalyzeError::UnknownTask`]. Each task maps to
//! exactly one [`OutputCategory`], which decides how its raw result is
//! normalized, rendered, and persisted.

use crate::error::AnalyzeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Represents the type of vision-language task being performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    /// Short image caption
    Caption,
    /// More detailed image caption
    DetailedCaption,
    /// Most detailed image caption
    MoreDetailedCaption,
    /// Object detection - labeled bounding boxes
    ObjectDetection,
    /// Dense region captioning - a caption per detected region
    DenseRegionCaption,
    /// Region proposal - unlabeled candidate boxes
    RegionProposal,
    /// Grounding caption phrases to boxes
    PhraseGrounding,
    /// Segmentation mask for a referring expression
    ReferringExpressionSegmentation,
    /// Segmentation mask for a localized region
    RegionToSegmentation,
    /// Detection of caller-supplied vocabulary
    OpenVocabularyDetection,
    /// Category name for a localized region
    RegionToCategory,
    /// Free-text description for a localized region
    RegionToDescription,
    /// Plain OCR transcript
    Ocr,
    /// OCR with quadrilateral text regions
    OcrWithRegion,
}

/// All recognized task types, in prompt-tag order.
pub const ALL_TASKS: [TaskType; 14] = [
    TaskType::Caption,
    TaskType::DetailedCaption,
    TaskType::MoreDetailedCaption,
    TaskType::ObjectDetection,
    TaskType::DenseRegionCaption,
    TaskType::RegionProposal,
    TaskType::PhraseGrounding,
    TaskType::ReferringExpressionSegmentation,
    TaskType::RegionToSegmentation,
    TaskType::OpenVocabularyDetection,
    TaskType::RegionToCategory,
    TaskType::RegionToDescription,
    TaskType::Ocr,
    TaskType::OcrWithRegion,
];

/// The rendering/persistence strategy for a task's results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputCategory {
    /// Decoded text, persisted verbatim
    PlainText,
    /// Axis-aligned labeled bounding boxes
    BoxSet,
    /// Labeled groups of segmentation polygons
    PolygonSet,
    /// Labeled 4-point text regions (OCR only)
    QuadBoxSet,
}

impl TaskType {
    /// Returns the prompt tag for this task, e.g. `<OD>`.
    pub fn tag(&self) -> &'static str {
        match self {
            TaskType::Caption => "<CAPTION>",
            TaskType::DetailedCaption => "<DETAILED_CAPTION>",
            TaskType::MoreDetailedCaption => "<MORE_DETAILED_CAPTION>",
            TaskType::ObjectDetection => "<OD>",
            TaskType::DenseRegionCaption => "<DENSE_REGION_CAPTION>",
            TaskType::RegionProposal => "<REGION_PROPOSAL>",
            TaskType::PhraseGrounding => "<CAPTION_TO_PHRASE_GROUNDING>",
            TaskType::ReferringExpressionSegmentation => "<REFERRING_EXPRESSION_SEGMENTATION>",
            TaskType::RegionToSegmentation => "<REGION_TO_SEGMENTATION>",
            TaskType::OpenVocabularyDetection => "<OPEN_VOCABULARY_DETECTION>",
            TaskType::RegionToCategory => "<REGION_TO_CATEGORY>",
            TaskType::RegionToDescription => "<REGION_TO_DESCRIPTION>",
            TaskType::Ocr => "<OCR>",
            TaskType::OcrWithRegion => "<OCR_WITH_REGION>",
        }
    }

    /// Returns the output category for this task.
    ///
    /// The mapping is total and static: every task has exactly one category.
    pub fn category(&self) -> OutputCategory {
        match self {
            TaskType::Caption
            | TaskType::DetailedCaption
            | TaskType::MoreDetailedCaption
            | TaskType::RegionToCategory
            | TaskType::RegionToDescription
            | TaskType::Ocr => OutputCategory::PlainText,
            TaskType::ObjectDetection
            | TaskType::DenseRegionCaption
            | TaskType::RegionProposal
            | TaskType::PhraseGrounding
            | TaskType::OpenVocabularyDetection => OutputCategory::BoxSet,
            TaskType::ReferringExpressionSegmentation | TaskType::RegionToSegmentation => {
                OutputCategory::PolygonSet
            }
            TaskType::OcrWithRegion => OutputCategory::QuadBoxSet,
        }
    }

    /// Returns the artifact directory name derived from this task's tag.
    pub fn dir_name(&self) -> String {
        dir_name_from_tag(self.tag())
    }

    /// Parses a prompt tag into a task type.
    ///
    /// Fails with [`AnalyzeError::UnknownTask`] for anything outside the
    /// fixed set; the match is exact, including the angle brackets.
    pub fn parse(tag: &str) -> Result<Self, AnalyzeError> {
        ALL_TASKS
            .iter()
            .find(|task| task.tag() == tag)
            .copied()
            .ok_or_else(|| AnalyzeError::unknown_task(tag))
    }
}

impl FromStr for TaskType {
    type Err = AnalyzeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskType::parse(s)
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Derives an artifact directory name from a prompt tag.
///
/// Strips leading/trailing `<`/`>` decoration, replaces spaces with
/// underscores, and lowercases. Output directory names depend on this
/// derivation, so it must stay in sync with the raw-result keys produced
/// by the inference provider.
pub fn dir_name_from_tag(tag: &str) -> String {
    tag.trim_matches(|c| c == '<' || c == '>')
        .replace(' ', "_")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_total_over_all_tags() {
        for task in ALL_TASKS {
            assert_eq!(TaskType::parse(task.tag()).unwrap(), task);
        }
    }

    #[test]
    fn test_parse_rejects_unknown_tags() {
        for tag in ["<BOGUS>", "OD", "<od>", "", "<OD> "] {
            let err = TaskType::parse(tag).unwrap_err();
            assert!(matches!(err, AnalyzeError::UnknownTask { .. }), "{tag}");
        }
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(TaskType::Caption.category(), OutputCategory::PlainText);
        assert_eq!(TaskType::Ocr.category(), OutputCategory::PlainText);
        assert_eq!(TaskType::ObjectDetection.category(), OutputCategory::BoxSet);
        assert_eq!(
            TaskType::OpenVocabularyDetection.category(),
            OutputCategory::BoxSet
        );
        assert_eq!(
            TaskType::RegionToSegmentation.category(),
            OutputCategory::PolygonSet
        );
        assert_eq!(
            TaskType::OcrWithRegion.category(),
            OutputCategory::QuadBoxSet
        );
    }

    #[test]
    fn test_dir_name_derivation() {
        assert_eq!(TaskType::ObjectDetection.dir_name(), "od");
        assert_eq!(TaskType::OcrWithRegion.dir_name(), "ocr_with_region");
        assert_eq!(dir_name_from_tag("<DENSE REGION CAPTION>"), "dense_region_caption");
    }

    #[test]
    fn test_display_round_trip() {
        for task in ALL_TASKS {
            assert_eq!(task.to_string().parse::<TaskType>().unwrap(), task);
        }
    }
}
