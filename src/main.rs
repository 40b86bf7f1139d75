use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use story_studio::config::Config;
use story_studio::gemini::GeminiClient;
use story_studio::models::{AspectRatio, ReferenceImage, CHARACTER_SLOTS};
use story_studio::state::{Action, Studio};
use story_studio::{api, archive};

#[derive(Parser)]
#[command(name = "story-studio")]
#[command(about = "Generate consistent story images from reference characters")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Generate one batch from local files and save the results
    Generate {
        /// Reference character image (repeat up to 4 times)
        #[arg(short, long = "character", required = true)]
        characters: Vec<PathBuf>,

        /// Prompt text (repeat up to 10 times)
        #[arg(short, long = "prompt", required = true)]
        prompts: Vec<String>,

        /// Output directory (defaults to the download directory)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Also bundle all results into a ZIP archive
        #[arg(short, long)]
        archive: bool,

        /// Aspect ratio (16:9, 9:16, 1:1, 4:3)
        #[arg(long, default_value = "1:1")]
        aspect_ratio: AspectRatio,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "story_studio=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn serve(config: &Config, port: u16) -> anyhow::Result<()> {
    let studio = Studio::new(Arc::new(GeminiClient::from_config(config)));
    let app = api::create_router(studio);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    tracing::info!("story-studio listening on http://127.0.0.1:{}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn generate(
    config: &Config,
    characters: Vec<PathBuf>,
    prompts: Vec<String>,
    out: Option<PathBuf>,
    bundle: bool,
    aspect_ratio: AspectRatio,
) -> anyhow::Result<()> {
    if characters.len() > CHARACTER_SLOTS as usize {
        bail!("At most {} character images are supported", CHARACTER_SLOTS);
    }

    let studio = Studio::new(Arc::new(GeminiClient::from_config(config)));
    studio.dispatch(Action::SetAspectRatio(aspect_ratio)).await?;

    for (slot, path) in (1..=CHARACTER_SLOTS).zip(&characters) {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime_type = mime_guess::from_path(path).first_or_octet_stream();
        if mime_type.type_() != mime_guess::mime::IMAGE {
            bail!("{} is not an image ({})", path.display(), mime_type);
        }
        studio
            .dispatch(Action::AttachImage {
                id: slot,
                image: ReferenceImage::new(bytes, mime_type.essence_str()),
            })
            .await?;
    }

    for (i, text) in prompts.into_iter().enumerate() {
        let state = if i == 0 {
            studio.snapshot().await
        } else {
            studio.add_prompt().await?
        };
        let id = state
            .prompts()
            .last()
            .map(|p| p.id)
            .context("Prompt list is empty")?;
        studio.dispatch(Action::UpdatePrompt { id, text }).await?;
    }

    let state = studio.generate_all().await?;
    if let Some(error) = state.error() {
        eprintln!("{}", error);
    }

    let out = out.unwrap_or_else(|| config.download_dir.clone());
    for (index, image) in state.results().iter().enumerate() {
        let file_name = archive::download_file_name(index, archive::local_date(&image.created_at));
        let path = archive::trigger_download(&out, image, &file_name)?;
        println!("{}", path.display());
    }

    if bundle && !state.results().is_empty() {
        let path = archive::bundle_and_download(&out, state.results(), archive::today())?;
        println!("{}", path.display());
    }

    if state.results().is_empty() {
        bail!("No images were generated");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    // A missing credential is fatal before anything else runs
    let config = Config::from_env()?;

    match cli.command {
        Some(Commands::Serve { port }) => serve(&config, port).await?,
        Some(Commands::Generate {
            characters,
            prompts,
            out,
            archive,
            aspect_ratio,
        }) => generate(&config, characters, prompts, out, archive, aspect_ratio).await?,
        None => serve(&config, 3000).await?,
    }

    Ok(())
}
