use std::time::Duration;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use pet_seg_rs::{
    acquire,
    display::FileDisplay,
    logging::init_tracing,
    Config, DisplaySurface, ImageAcquisition, Model, SegmentationReporter, Session,
    StatusMessage,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_tracing(config.log_filter())?;

    let model_path = config.model_path();
    ensure!(
        model_path.exists(),
        "Model path does not exist: {}",
        model_path.display()
    );

    let model = Model::new(&model_path, config.device_id)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    let mut session = Session::new(
        model,
        SegmentationReporter::new(config.out_of_range),
        ImageAcquisition::new(config.require_gallery_permission),
    );
    let mut display = FileDisplay::new(&config.output);

    if let Err(err) = acquire(&mut session, &config) {
        display.show_text(&err.user_message())?;
        return Err(err).context("Failed to acquire an image");
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.green} [{elapsed}] {msg}")?);
    spinner.set_message(format!("Running {}", session.model().display_name()));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let outcome = if config.json {
        let outcome = session.predict().await;
        spinner.finish_and_clear();

        match &outcome {
            Ok(report) => {
                display.show_image(&report.display_image)?;
                display.show_text(&serde_json::to_string_pretty(report)?)?;
            }
            Err(err) => {
                let status = StatusMessage::from_outcome(&outcome);
                let body = serde_json::json!({ "error": status.text, "detail": err.to_string() });
                display.show_text(&serde_json::to_string_pretty(&body)?)?;
            }
        }
        outcome
    } else {
        let outcome = session.predict_and_display(&mut display).await;
        spinner.finish_and_clear();
        outcome
    };

    session.end();
    outcome.map(|_| ()).context("Segmentation did not produce a report")
}
