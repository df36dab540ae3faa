use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use coordinator::{
    config::{load_settings, load_settings_from},
    Coordinator,
};
use pixelate::{ImageLoader, SchemeLoader};
use relay_core::Document;
use shared::{domain::SurfaceId, protocol::ClickEvent};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Pixelates one image by driving it through the full relay: a surface with the
/// image is attached, the menu is clicked and the swapped-in result is saved.
#[derive(Parser, Debug)]
struct Args {
    /// Path, `file:`, `data:` or `http(s):` locator of the source image.
    #[arg(long)]
    image: String,
    #[arg(long, default_value = "tab-1")]
    surface: String,
    #[arg(long, default_value = "out.png")]
    out: PathBuf,
    /// How long to wait for each step before giving up.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = match &args.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let wait = Duration::from_secs(args.wait_secs);
    let loader: Arc<dyn ImageLoader> = Arc::new(SchemeLoader::default());
    let coordinator = Coordinator::start(settings, loader);

    let surface = SurfaceId::new(args.surface);
    let document = Document::with_images([args.image.clone()]);
    let mut revisions = document.subscribe();
    revisions.borrow_and_update();
    coordinator.attach_surface(surface.clone(), document.clone())?;

    tokio::time::timeout(wait, coordinator.wait_for_menu())
        .await
        .context("page logic never installed the menu")?;

    let Some(id) = coordinator.on_menu_click(ClickEvent {
        menu_id: coordinator.menu_id(),
        source_image_locator: args.image.clone(),
        target_surface: surface,
    })?
    else {
        bail!("menu click was not accepted");
    };
    info!(%id, image = %args.image, "pixel-relay: waiting for the rendered image");

    tokio::time::timeout(wait, revisions.changed())
        .await
        .with_context(|| format!("'{}' was not rendered within {wait:?}", args.image))?
        .context("document dropped before the image was rendered")?;

    let rendered = document
        .sources()
        .into_iter()
        .find(|src| src.starts_with(pixelate::PNG_DATA_URI_PREFIX))
        .context("document changed but holds no rendered image")?;
    let bytes = pixelate::decode_data_uri(&rendered)?;
    tokio::fs::write(&args.out, &bytes)
        .await
        .with_context(|| format!("failed to write '{}'", args.out.display()))?;
    info!(out = %args.out.display(), bytes = bytes.len(), "pixel-relay: saved");
    Ok(())
}
