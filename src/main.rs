use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use vismatch::core::{cache::ImageCache, embeddings, fetch, ingest};
use vismatch::{create_router, AppState, Catalog, Config};

#[derive(Parser, Debug)]
#[command(
    name = "vismatch",
    version,
    about = "Visual product matcher: build a feature store from a product catalog and serve similarity search over it"
)]
struct Cli {
    /// Directory holding products.json, the image cache and the feature store
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download catalog images into the local cache
    Fetch,
    /// Embed cached images and build the feature store
    Ingest,
    /// Serve the search API
    Serve {
        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vismatch::init()?;

    let cli = Cli::parse();

    let mut config = Config::from_env();
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    match cli.command {
        Command::Fetch => {
            let catalog = Catalog::load(config.catalog_path())?;
            let cache = ImageCache::open(config.images_dir())?;
            let report = fetch::fetch_images(
                &catalog,
                &cache,
                config.fetch_concurrency,
                config.fetch_timeout_secs,
            )
            .await?;

            if !report.failed.is_empty() {
                log::warn!(
                    "{} of {} downloads failed; re-run to retry them",
                    report.failed.len(),
                    report.total
                );
            }
        }
        Command::Ingest => {
            let catalog = Catalog::load(config.catalog_path())?;
            let cache = ImageCache::open(config.images_dir())?;
            let provider = embeddings::from_config(&config)?;

            ingest::run(
                &catalog,
                &cache,
                provider.as_ref(),
                &config.store_path(),
                config.embed_concurrency,
            )
            .await?;
        }
        Command::Serve { port } => {
            if let Some(port) = port {
                config.port = port;
            }
            let port = config.port;

            let state = AppState::load(config)?;
            let app = create_router(state);

            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            log::info!("Server listening on {}", addr);

            let listener = TcpListener::bind(addr).await?;
            axum::serve(listener, app).await?;
        }
    }

    Ok(())
}
