use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use docforge::{api, config::Config, db, llm};

#[derive(Parser)]
#[command(name = "docforge")]
#[command(about = "AI-assisted document authoring backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port for HTTP API
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },
    /// Report which generative model would be selected, then exit
    Probe,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "docforge=debug,tower_http=debug".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::from_env();

    match cli.command {
        Some(Commands::Serve { host, port }) => serve(config, &host, port).await?,
        Some(Commands::Probe) => {
            let content = content_service(&config).await;
            match content.active_model() {
                Some(model) => println!("Active model: {}", model),
                None => println!("No generative backend available; fallback mode"),
            }
        }
        None => serve(config, "127.0.0.1", 8000).await?,
    }

    Ok(())
}

async fn content_service(config: &Config) -> llm::ContentService {
    let connector = llm::GeminiConnector::new(config.llm.base_url.clone(), config.llm.timeout);
    let backend = llm::select_backend(
        config.llm.api_key.as_deref(),
        &config.llm.candidate_models,
        &connector,
    )
    .await;
    llm::ContentService::new(backend)
}

async fn serve(config: Config, host: &str, port: u16) -> anyhow::Result<()> {
    tracing::info!("Starting docforge server on {}:{}", host, port);

    let db = match &config.database_path {
        Some(path) => db::Database::open(path.clone())?,
        None => db::Database::open_default()?,
    };
    db.migrate()?;

    let content = content_service(&config).await;
    let state = api::AppState::new(db, content, config.auth.clone());
    let app = api::create_router_with_cors(state, &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port)).await?;
    tracing::info!("docforge server listening on http://{}:{}", host, port);

    axum::serve(listener, app).await?;
    Ok(())
}
