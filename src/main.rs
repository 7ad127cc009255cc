use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;
use web_summarizer::{
    AppState,
    api::routes::create_router,
    auth::PasswordHash,
    config::Config,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // `web-summarizer hash-password <password>` prints a value for AUTH_PASSWORD_HASH
    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some("hash-password") {
        let Some(password) = args.get(2) else {
            eprintln!("usage: web-summarizer hash-password <password>");
            std::process::exit(2);
        };
        println!("{}", PasswordHash::new(password)?.encode());
        return Ok(());
    }

    // Load configuration
    let config = Config::load()?;
    let server_addr = config.server_addr;
    info!("Model: {}", config.llm_model);
    info!("Prompts directory: {}", config.prompts_dir.display());

    let app_state = AppState::new(config)?;
    let app = create_router(app_state);

    let listener = TcpListener::bind(server_addr).await?;

    info!("Listening on {}", server_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
