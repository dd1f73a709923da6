use clap::Parser;
use deed_backend::config::Args;
use deed_backend::{app, AppState, Exchange, Store};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("deed_backend={},info", args.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = match &args.persist_path {
        Some(path) => {
            info!(path = %path.display(), "persisting state");
            AppState::with_persistence(path.clone(), args.seed).await?
        }
        None => AppState::new(Exchange::new(Store::default(), args.seed)),
    };

    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!(listen = %args.listen, "starting server");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
