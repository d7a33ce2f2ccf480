use clap::Parser;
use dotenvy::dotenv;
use expense_quest::{
    cli::{AppContext, Cli, dispatch},
    config::{database, settings},
    core::tracker::Catalogs,
    errors::Result,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    // 2. Load .env file, non-fatal since env vars can be set externally
    dotenv().ok();

    let cli = Cli::parse();

    // 3. Load settings, falling back to defaults when the file is absent
    let settings = settings::load_config_or_default(&cli.config)
        .inspect_err(|e| error!("Failed to load settings: {}", e))?;

    // 4. Open the database and make sure the schema exists
    let db = database::create_connection()
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db).await?;
    info!("Database ready");

    let ctx = AppContext {
        db,
        settings,
        catalogs: Catalogs::standard(),
        user: cli.user,
        today: chrono::Local::now().date_naive(),
    };

    let output = dispatch(&ctx, cli.command)
        .await
        .inspect_err(|e| error!("Command failed: {}", e))?;
    print!("{output}");
    Ok(())
}
