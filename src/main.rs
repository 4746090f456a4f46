//! Image analysis CLI.
//!
//! Runs one task against one image and leaves its artifacts under the
//! output directory: a copy of the input image, a text dump of the raw
//! result, and (for geometric tasks) a labeled overlay.
//!
//! Inference execution is out of scope for this crate, so the binary feeds
//! recorded raw results through the pipeline: `--result-json` points at a
//! JSON file holding the provider output for the requested task, keyed by
//! its prompt tag. Library consumers wire a real model behind
//! [`InferenceProvider`] instead.
//!
//! # Example
//!
//! ```bash
//! florence-viz --model-id ./Florence-2-large --image-path dataset/000.png \
//!     --task '<OD>' --result-json recorded/od.json
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use florence_viz::{
    AnalyzeError, ImageAnalyzer, InferenceProvider, RawResult, TaskType, VizResult, load_image,
};
use image::RgbImage;

/// Command-line arguments for the analysis run.
#[derive(Parser)]
#[command(name = "florence-viz")]
#[command(about = "Normalizes vision-language results and renders labeled overlays")]
struct Args {
    /// Model identifier, recorded for the run log
    #[arg(long)]
    model_id: String,

    /// Path to the local image file
    #[arg(long)]
    image_path: PathBuf,

    /// Task prompt tag, e.g. '<OD>' or '<CAPTION>'
    #[arg(long)]
    task: String,

    /// Additional text input for tasks that require one
    #[arg(long)]
    text_input: Option<String>,

    /// Directory to save output files
    #[arg(long, default_value = "outputs")]
    output_dir: PathBuf,

    /// Fill segmentation polygons instead of outlining only
    #[arg(long)]
    fill: bool,

    /// Recorded raw-result JSON file keyed by the task's prompt tag
    #[arg(long)]
    result_json: PathBuf,
}

/// Provider that replays a recorded raw result from a JSON file.
struct JsonReplayProvider {
    path: PathBuf,
}

impl InferenceProvider for JsonReplayProvider {
    fn infer(
        &mut self,
        task: TaskType,
        _image: &RgbImage,
        _text_input: Option<&str>,
    ) -> VizResult<RawResult> {
        let data = std::fs::read_to_string(&self.path)?;
        let value: serde_json::Value =
            serde_json::from_str(&data).map_err(AnalyzeError::inference)?;
        let raw = RawResult::new(value);
        // the recorded result must belong to the requested task
        let (tag, _) = raw.entry()?;
        if tag != task.tag() {
            return Err(AnalyzeError::malformed(format!(
                "recorded result is keyed by {tag}, expected {}",
                task.tag()
            )));
        }
        Ok(raw)
    }
}

fn main() -> ExitCode {
    florence_viz::init_tracing();
    let args = Args::parse();

    match run(args) {
        Ok(output_dir) => {
            println!("Analysis complete. Results saved in {}", output_dir.display());
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "analysis failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> VizResult<PathBuf> {
    let task = TaskType::parse(&args.task)?;
    let image = load_image(&args.image_path)?;
    info!(model_id = %args.model_id, task = %task, "starting analysis");

    let provider = JsonReplayProvider {
        path: args.result_json,
    };
    let mut analyzer = ImageAnalyzer::new(provider, image, &args.output_dir)?;

    let raw = analyzer.run(task, args.text_input.as_deref())?;
    if let Some(path) = analyzer.visualize(task, &raw, args.fill)? {
        info!(path = %path.display(), "overlay written");
    }

    Ok(args.output_dir)
}
