use merry_style_core::{
    config::Config,
    export::{save_download, share_image, ClipboardShare, ShareOutcome},
    init,
    session::{self, SessionController},
    ui, GeminiClient, HatColor, Lifecycle,
};
use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Put a festive hat on every face in a photo", long_about = None)]
struct Args {
    /// Photo to edit; opens the editor window when omitted
    image: Option<PathBuf>,

    /// Hat color: red, green, blue, gold, pink or purple
    #[arg(short, long, default_value = "red")]
    color: HatColor,

    /// Directory the result is written to
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Override the model defined in .env
    #[arg(short, long)]
    model: Option<String>,

    /// Copy the result to the clipboard as well
    #[arg(short, long, default_value_t = false)]
    share: bool,

    /// Print a JSON summary instead of plain text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Open the editor window, preloaded with IMAGE if given
    #[arg(long)]
    preview: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("merry_style=info".parse()?),
        )
        .init();

    let args = Args::parse();
    tracing::debug!(?args, "parsed arguments");

    // A bad photo is reported before any missing API key
    let mut controller = prepare_session(&args)?;

    // Load config and override model if specified via CLI
    let config = load_config(args.model.clone())?;

    if args.preview || args.image.is_none() {
        // eframe needs the main thread; keep the runtime out of its way
        return tokio::task::block_in_place(|| ui::run_editor(config, controller, args.output_dir))
            .context("Editor window failed");
    }

    let client = GeminiClient::new(&config).context("Failed to create Gemini client")?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("{spinner:.green} {msg}")?,
    );
    spinner.set_message(format!(
        "Adding a {} hat with {}...",
        args.color.name().to_lowercase(),
        client.model_name()
    ));
    spinner.enable_steady_tick(Duration::from_millis(100));

    let lifecycle = session::run_generation(&mut controller, &client).await;

    spinner.finish_and_clear();

    let state = controller.state();
    match lifecycle {
        Some(Lifecycle::Success) => {}
        Some(_) => bail!(
            "Generation failed: {}",
            state.error().unwrap_or("Something went wrong while generating the image.")
        ),
        None => bail!("Nothing to generate"),
    }

    let Some(image) = state.result() else {
        bail!("Generation finished without a result");
    };

    let path = save_download(image, state.color(), &args.output_dir)
        .context("Failed to save the result")?;

    let shared = if args.share {
        Some(share_image(&mut ClipboardShare, image))
    } else {
        None
    };

    if args.json {
        let summary = json!({
            "path": path,
            "mime_type": image.mime_type,
            "color": state.color(),
            "aspect_ratio": state.aspect_ratio(),
            "lifecycle": state.lifecycle(),
            "shared": matches!(shared, Some(ShareOutcome::Shared)),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Saved {}", path.display());
        match shared {
            Some(ShareOutcome::Shared) => println!("(Copied to clipboard)"),
            Some(ShareOutcome::Unsupported(notice)) => eprintln!("{}", notice),
            Some(ShareOutcome::Failed(_)) | None => {}
        }
    }

    Ok(())
}

fn prepare_session(args: &Args) -> Result<SessionController> {
    let mut controller = SessionController::new();
    if let Some(path) = &args.image {
        session::ingest_file(&mut controller, path)
            .with_context(|| format!("Cannot use {}", path.display()))?;
    }
    controller.select_color(args.color);
    Ok(controller)
}

fn load_config(model: Option<String>) -> Result<Config> {
    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(m) = model {
        config.model_name = m;
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;

    #[test]
    fn test_args_defaults() {
        let args = Args::try_parse_from(["merry-style", "me.jpg"]).unwrap();
        assert_eq!(args.color, HatColor::Red);
        assert_eq!(args.output_dir, PathBuf::from("."));
        assert!(!args.preview);
    }

    #[test]
    fn test_args_color_is_case_insensitive() {
        let args = Args::try_parse_from(["merry-style", "me.jpg", "--color", "Gold"]).unwrap();
        assert_eq!(args.color, HatColor::Gold);
    }

    #[test]
    fn test_args_reject_unknown_color() {
        assert!(Args::try_parse_from(["merry-style", "me.jpg", "--color", "teal"]).is_err());
    }

    #[test]
    fn test_non_image_is_rejected_before_config() {
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "not a photo").unwrap();

        let args = Args::try_parse_from([
            OsString::from("merry-style"),
            notes.into_os_string(),
            OsString::from("--color"),
            OsString::from("green"),
        ])
        .unwrap();
        let err = prepare_session(&args).unwrap_err();
        assert!(format!("{:#}", err).contains("Please upload an image file"));
    }

    #[test]
    fn test_prepare_session_applies_color() {
        let args = Args::try_parse_from(["merry-style", "--color", "pink"]).unwrap();
        let controller = prepare_session(&args).unwrap();
        assert_eq!(controller.state().color(), HatColor::Pink);
        assert!(controller.state().original().is_none());
    }
}
