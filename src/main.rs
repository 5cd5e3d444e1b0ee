use clap::Parser;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

use yatube::blog::{BlogRepository, SqliteBlogRepository};
use yatube::config::{Cli, Command, Config};
use yatube::db;
use yatube::routes;
use yatube::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Ensure media directory exists
    std::fs::create_dir_all(config.media_path())?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if let Some(Command::CreateGroup {
        title,
        slug,
        description,
    }) = &cli.command
    {
        let repo = SqliteBlogRepository::new(pool);
        let group = repo.create_group(title, slug, description).await?;
        tracing::info!("Created group {} ({})", group.title, group.slug);
        return Ok(());
    }

    let state = AppState::new(pool, config.clone());
    let app = routes::app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
