use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use thumbgrid::screen::should_surface;
use thumbgrid::{
    AlwaysAuthorized, DirectoryAssetStore, GridConfig, GridScreen, GridServices, LayoutQuery,
    MemoryCachingBackend, Rect,
};

const CONTAINER_WIDTH: f64 = 398.0;
const VIEWPORT_HEIGHT: f64 = 800.0;

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("thumbgrid=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let root = match std::env::args_os().nth(1) {
        Some(arg) => PathBuf::from(arg),
        None => directories::UserDirs::new()
            .and_then(|dirs| dirs.picture_dir().map(PathBuf::from))
            .context("No directory given and no pictures directory found")?,
    };

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(root))
}

/// Scroll through the whole directory once, loading visible thumbnails.
async fn run(root: PathBuf) -> Result<()> {
    let config = GridConfig::default();
    let runtime = tokio::runtime::Handle::current();

    let store = Arc::new(DirectoryAssetStore::new(&root));
    let backend = Arc::new(MemoryCachingBackend::new(
        store,
        runtime.clone(),
        config.backend_memory_bytes(),
    ));

    let services = GridServices {
        store: backend.clone(),
        backend: backend.clone(),
        permissions: Arc::new(AlwaysAuthorized),
        runtime,
    };
    let mut screen = GridScreen::new(services, &config, CONTAINER_WIDTH)?;

    let count = match screen.reload().await {
        Ok(count) => count,
        Err(e) if should_surface(&e) => {
            return Err(e).with_context(|| format!("Cannot open {}", root.display()));
        }
        Err(e) => {
            warn!(error = %e, "Reload failed");
            0
        }
    };
    info!(count, root = %root.display(), "Opened grid");
    screen.load_initial_thumbnails();

    let content_height = screen.layout().content_height();
    let mut offset = 0.0;
    loop {
        let visible = Rect::new(0.0, offset, CONTAINER_WIDTH, VIEWPORT_HEIGHT);
        screen.on_scroll(visible, VIEWPORT_HEIGHT);

        let indices = screen.layout().index_paths_intersecting(visible);
        for index in indices {
            screen.cell_will_appear(index);
        }

        while screen.thumbnails().pending_count() > 0 {
            match tokio::time::timeout(Duration::from_secs(30), screen.next_completion()).await {
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    warn!("Timed out waiting for thumbnails");
                    break;
                }
            }
        }
        screen.apply_completions();

        if offset + VIEWPORT_HEIGHT >= content_height {
            break;
        }
        offset += VIEWPORT_HEIGHT / 2.0;
    }

    info!(
        loaded = screen.thumbnails().cached_count(),
        warm_entries = backend.entry_count(),
        warm_bytes = backend.memory_usage(),
        "Finished scrolling"
    );

    screen.teardown();
    Ok(())
}
