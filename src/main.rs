use std::io;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use yolo_search::{
    discovery, logging, Cli, SearchError, SearchSummary, Searcher, Settings, YoloModel,
};

const MODEL_HINT: &str = "Failed to load the detection model. Export it to ONNX \
     (e.g. `yolo export model=yolov8n.pt format=onnx`) and set YOLO_MODEL to its path";

fn main() -> ExitCode {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();
    logging::init();

    match dotenv {
        Ok(path) => tracing::debug!("Loaded settings from {}", path.display()),
        Err(err) if err.not_found() => {}
        Err(err) => tracing::warn!("Ignoring unreadable .env file: {err}"),
    }

    match run(&cli) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            let code = err
                .downcast_ref::<SearchError>()
                .map_or(1, SearchError::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(cli: &Cli) -> Result<SearchSummary> {
    let settings = Settings::from_env()?;
    discovery::validate_root(&cli.path)?;

    let model = YoloModel::new(&settings.model, settings.confidence_threshold)
        .context(MODEL_HINT)?;

    let searcher = Searcher::new(model, settings);
    let summary = searcher.search_directory(&cli.path, &mut io::stdout().lock())?;
    Ok(summary)
}
