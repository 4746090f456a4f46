//! Orchestration of inference calls into persisted artifacts.
//!
//! [`ImageAnalyzer`] is the only component aware of the inference boundary:
//! it drives the external [`InferenceProvider`], writes an unconditional
//! text dump of every raw result, and exposes the visualization entry
//! points that normalize, render, and save labeled overlays.
//!
//! Text logging is eager and visualization is lazy on purpose: every
//! inference call leaves an auditable trace even when visualization is
//! skipped or fails. The pipeline is single-threaded and synchronous; no
//! retries are attempted anywhere.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::info;

use crate::artifacts::PathAllocator;
use crate::error::{AnalyzeError, VizResult};
use crate::normalize::{self, NormalizedResult, RawResult, TaskOutput};
use crate::render::{self, ColorPicker, RenderConfig, UniformPalette};
use crate::task::{OutputCategory, TaskType};

/// The external inference capability.
///
/// The model is treated as an opaque function from task, image, and
/// optional text input to a raw result keyed by a prompt tag. Providers
/// must fail with a distinguishable error when the task/text-input
/// combination is unsupported.
pub trait InferenceProvider {
    /// Runs inference for one task against one image.
    fn infer(
        &mut self,
        task: TaskType,
        image: &RgbImage,
        text_input: Option<&str>,
    ) -> VizResult<RawResult>;
}

/// Drives normalization, rendering, and persistence for one source image.
pub struct ImageAnalyzer<P> {
    provider: P,
    image: RgbImage,
    output_dir: PathBuf,
    render_config: RenderConfig,
    colors: Box<dyn ColorPicker>,
    allocators: HashMap<(String, &'static str), PathAllocator>,
}

impl<P: InferenceProvider> ImageAnalyzer<P> {
    /// Creates an analyzer for one image, rooted at `output_dir`.
    ///
    /// The output directory is created if absent and a copy of the input
    /// image is saved directly under it as the next sequential `NNNNNN.png`.
    pub fn new(provider: P, image: RgbImage, output_dir: impl Into<PathBuf>) -> VizResult<Self> {
        let mut analyzer = Self {
            provider,
            image,
            output_dir: output_dir.into(),
            render_config: RenderConfig::with_system_font(),
            colors: Box::new(UniformPalette),
            allocators: HashMap::new(),
        };
        analyzer.save_input_image()?;
        Ok(analyzer)
    }

    /// Replaces the render configuration.
    pub fn with_render_config(mut self, config: RenderConfig) -> Self {
        self.render_config = config;
        self
    }

    /// Replaces the color-selection strategy.
    pub fn with_color_picker(mut self, colors: Box<dyn ColorPicker>) -> Self {
        self.colors = colors;
        self
    }

    /// The source image under analysis.
    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The root output directory.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Runs one task through the provider.
    ///
    /// The raw result's JSON string is always dumped to
    /// `output_dir/<task dir>/<seq>.txt` before returning, regardless of
    /// the task's output category. The result itself is returned raw;
    /// shape normalization happens in the visualization entry points the
    /// caller picks separately.
    pub fn run(&mut self, task: TaskType, text_input: Option<&str>) -> VizResult<RawResult> {
        let raw = self.provider.infer(task, &self.image, text_input)?;
        self.save_text_dump(task, &raw)?;
        Ok(raw)
    }

    /// Normalizes a box-set result and saves the rectangle overlay.
    pub fn save_box_overlay(&mut self, raw: &RawResult) -> VizResult<PathBuf> {
        let normalized = normalize::normalize(OutputCategory::BoxSet, raw)?;
        self.render_and_save(&normalized, false)
    }

    /// Normalizes a polygon-set result and saves the segmentation overlay.
    pub fn save_polygon_overlay(&mut self, raw: &RawResult, fill: bool) -> VizResult<PathBuf> {
        let normalized = normalize::normalize(OutputCategory::PolygonSet, raw)?;
        self.render_and_save(&normalized, fill)
    }

    /// Normalizes a quad-box result and saves the OCR region overlay.
    pub fn save_quad_overlay(&mut self, raw: &RawResult) -> VizResult<PathBuf> {
        let normalized = normalize::normalize(OutputCategory::QuadBoxSet, raw)?;
        self.render_and_save(&normalized, false)
    }

    /// Adapts an open-vocabulary-detection result and saves the box overlay.
    pub fn save_open_vocab_overlay(&mut self, raw: &RawResult) -> VizResult<PathBuf> {
        let normalized = normalize::open_vocab_to_boxes(raw)?;
        self.render_and_save(&normalized, false)
    }

    /// Saves the overlay appropriate for the task's output category.
    ///
    /// Plain-text tasks have no overlay and return None. Open-vocabulary
    /// detection routes through its schema adapter. `fill` applies to
    /// segmentation polygons only.
    pub fn visualize(
        &mut self,
        task: TaskType,
        raw: &RawResult,
        fill: bool,
    ) -> VizResult<Option<PathBuf>> {
        match task.category() {
            OutputCategory::PlainText => Ok(None),
            OutputCategory::BoxSet if task == TaskType::OpenVocabularyDetection => {
                self.save_open_vocab_overlay(raw).map(Some)
            }
            OutputCategory::BoxSet => self.save_box_overlay(raw).map(Some),
            OutputCategory::PolygonSet => self.save_polygon_overlay(raw, fill).map(Some),
            OutputCategory::QuadBoxSet => self.save_quad_overlay(raw).map(Some),
        }
    }

    fn save_input_image(&mut self) -> VizResult<()> {
        let image = self.image.clone();
        let path = self.allocator("", "png")?.allocate();
        image.save(&path).map_err(AnalyzeError::ImageEncode)?;
        info!(path = %path.display(), "saved input image");
        Ok(())
    }

    fn save_text_dump(&mut self, task: TaskType, raw: &RawResult) -> VizResult<()> {
        let dir_name = task.dir_name();
        let text = raw.to_json_string();
        let path = self.allocator(&dir_name, "txt")?.allocate();
        fs::write(&path, text)?;
        info!(path = %path.display(), "saved raw result text");
        Ok(())
    }

    fn render_and_save(&mut self, normalized: &NormalizedResult, fill: bool) -> VizResult<PathBuf> {
        let canvas = match &normalized.output {
            TaskOutput::Boxes(boxes) => {
                render::render_boxes(&self.image, boxes, &self.render_config)
            }
            TaskOutput::Polygons(groups) => render::render_polygons(
                &self.image,
                groups,
                fill,
                &self.render_config,
                self.colors.as_mut(),
            ),
            TaskOutput::QuadBoxes(quads) => render::render_quad_boxes(
                &self.image,
                quads,
                &self.render_config,
                self.colors.as_mut(),
            ),
            TaskOutput::Text(_) => {
                return Err(AnalyzeError::malformed("text results have no overlay"));
            }
        };

        let path = self.allocator(&normalized.dir_name, "png")?.allocate();
        canvas.save(&path).map_err(AnalyzeError::ImageEncode)?;
        info!(path = %path.display(), "saved overlay");
        Ok(path)
    }

    /// Returns the allocator for a task directory and extension, opening it
    /// lazily on first use. An empty directory name addresses the root.
    fn allocator(
        &mut self,
        dir_name: &str,
        extension: &'static str,
    ) -> VizResult<&mut PathAllocator> {
        use std::collections::hash_map::Entry;

        match self.allocators.entry((dir_name.to_string(), extension)) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let dir = if dir_name.is_empty() {
                    self.output_dir.clone()
                } else {
                    self.output_dir.join(dir_name)
                };
                Ok(entry.insert(PathAllocator::open(dir, extension)?))
            }
        }
    }
}

/// Loads a local image file as RGB.
///
/// Only local paths are supported; anything unresolvable is reported as
/// [`AnalyzeError::SourceUnavailable`].
pub fn load_image(path: &Path) -> VizResult<RgbImage> {
    if !path.exists() {
        return Err(AnalyzeError::SourceUnavailable {
            path: path.display().to_string(),
        });
    }
    let img = image::open(path).map_err(AnalyzeError::ImageLoad)?;
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};
    use serde_json::{Value, json};
    use tempfile::tempdir;

    const BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);

    fn create_test_image(width: u32, height: u32) -> RgbImage {
        ImageBuffer::from_pixel(width, height, Rgb([255, 255, 255]))
    }

    /// Provider that replays a fixed JSON value.
    struct FixedProvider {
        value: Value,
    }

    impl InferenceProvider for FixedProvider {
        fn infer(
            &mut self,
            _task: TaskType,
            _image: &RgbImage,
            _text_input: Option<&str>,
        ) -> VizResult<RawResult> {
            Ok(RawResult::new(self.value.clone()))
        }
    }

    /// Provider that always fails.
    struct FailingProvider;

    impl InferenceProvider for FailingProvider {
        fn infer(
            &mut self,
            _task: TaskType,
            _image: &RgbImage,
            _text_input: Option<&str>,
        ) -> VizResult<RawResult> {
            Err(AnalyzeError::inference(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "task requires a region string",
            )))
        }
    }

    #[test]
    fn test_new_saves_input_image() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider { value: json!({}) };
        let _analyzer =
            ImageAnalyzer::new(provider, create_test_image(16, 16), dir.path()).unwrap();
        assert!(dir.path().join("000000.png").is_file());
    }

    #[test]
    fn test_detection_end_to_end() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider {
            value: json!({"<OD>": {"bboxes": [[50.0, 80.0, 10.0, 20.0]], "labels": ["cat"]}}),
        };
        let mut analyzer =
            ImageAnalyzer::new(provider, create_test_image(100, 100), dir.path()).unwrap();

        let raw = analyzer.run(TaskType::ObjectDetection, None).unwrap();

        // unconditional text dump with the literal label
        let dump = fs::read_to_string(dir.path().join("od/000000.txt")).unwrap();
        assert!(dump.contains("\"cat\""));

        // overlay draws the corrected rectangle from (10,20) to (50,80)
        let overlay_path = analyzer.visualize(TaskType::ObjectDetection, &raw, false).unwrap();
        assert_eq!(overlay_path, Some(dir.path().join("od/000000.png")));
        let overlay = image::open(dir.path().join("od/000000.png")).unwrap().to_rgb8();
        assert_eq!(*overlay.get_pixel(10, 20), BOX_COLOR);
        assert_eq!(*overlay.get_pixel(50, 80), BOX_COLOR);
    }

    #[test]
    fn test_text_dumps_are_sequential() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider {
            value: json!({"<CAPTION>": "A cat on a mat."}),
        };
        let mut analyzer =
            ImageAnalyzer::new(provider, create_test_image(8, 8), dir.path()).unwrap();

        analyzer.run(TaskType::Caption, None).unwrap();
        analyzer.run(TaskType::Caption, None).unwrap();

        assert!(dir.path().join("caption/000000.txt").is_file());
        assert!(dir.path().join("caption/000001.txt").is_file());
        assert!(!dir.path().join("caption/000002.txt").exists());
    }

    #[test]
    fn test_plain_text_tasks_have_no_overlay() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider {
            value: json!({"<OCR>": "hello world"}),
        };
        let mut analyzer =
            ImageAnalyzer::new(provider, create_test_image(8, 8), dir.path()).unwrap();
        let raw = analyzer.run(TaskType::Ocr, None).unwrap();
        assert_eq!(analyzer.visualize(TaskType::Ocr, &raw, false).unwrap(), None);
    }

    #[test]
    fn test_open_vocab_routes_through_adapter() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider {
            value: json!({"<OPEN_VOCABULARY_DETECTION>": {
                "bboxes": [[10.0, 10.0, 30.0, 30.0]],
                "bboxes_labels": ["a green car"]
            }}),
        };
        let mut analyzer =
            ImageAnalyzer::new(provider, create_test_image(64, 64), dir.path()).unwrap();
        let raw = analyzer.run(TaskType::OpenVocabularyDetection, None).unwrap();
        let overlay_path = analyzer
            .visualize(TaskType::OpenVocabularyDetection, &raw, false)
            .unwrap();
        assert_eq!(
            overlay_path,
            Some(dir.path().join("open_vocabulary_detection/000000.png"))
        );
        let overlay = image::open(overlay_path.unwrap()).unwrap().to_rgb8();
        assert_eq!(*overlay.get_pixel(10, 10), BOX_COLOR);
    }

    #[test]
    fn test_segmentation_overlay_is_written() {
        let dir = tempdir().unwrap();
        let provider = FixedProvider {
            value: json!({"<REGION_TO_SEGMENTATION>": {
                "polygons": [[[10.0, 10.0, 40.0, 10.0, 40.0, 40.0, 10.0, 40.0]]],
                "labels": [""]
            }}),
        };
        let mut analyzer =
            ImageAnalyzer::new(provider, create_test_image(64, 64), dir.path()).unwrap();
        let raw = analyzer.run(TaskType::RegionToSegmentation, None).unwrap();
        let overlay_path = analyzer
            .visualize(TaskType::RegionToSegmentation, &raw, true)
            .unwrap()
            .unwrap();
        assert_eq!(
            overlay_path,
            dir.path().join("region_to_segmentation/000000.png")
        );
        let overlay = image::open(&overlay_path).unwrap().to_rgb8();
        assert!(render::PALETTE.contains(overlay.get_pixel(25, 25)));
    }

    #[test]
    fn test_provider_errors_propagate_without_text_dump() {
        let dir = tempdir().unwrap();
        let mut analyzer =
            ImageAnalyzer::new(FailingProvider, create_test_image(8, 8), dir.path()).unwrap();
        let err = analyzer.run(TaskType::PhraseGrounding, None).unwrap_err();
        assert!(matches!(err, AnalyzeError::Inference(_)));
        assert!(!dir.path().join("caption_to_phrase_grounding").exists());
    }

    #[test]
    fn test_load_image_reports_missing_source() {
        let err = load_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, AnalyzeError::SourceUnavailable { .. }));
    }
}
