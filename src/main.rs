use chat_relay::{build_app, AppState, OpenAiClient, Settings};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let provider = OpenAiClient::from_settings(&settings.provider);
    if provider.is_configured() {
        tracing::info!("Initializing OpenAI client ({})...", settings.provider.base_url);
    } else {
        tracing::warn!("OPENAI_API_KEY not found. Provider calls will fail until it is set.");
    }

    let config = settings.relay;
    tracing::info!(
        "Relay variant: {:?}, model: {}, shortcut: {}, CORS origins: {:?}",
        config.variant,
        config.default_model,
        if config.shortcut_enabled { "✅" } else { "❌" },
        config.allowed_origins
    );

    let shared_state = Arc::new(AppState::new(config, Arc::new(provider)));
    let app = build_app(shared_state);

    let listener = match tokio::net::TcpListener::bind(settings.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("❌ Failed to bind {}: {}", settings.bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", settings.bind_addr);

    if let Err(e) = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    {
        tracing::error!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,chat_relay=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,chat_relay=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    // JSON logs when LOG_FORMAT=json, human-readable otherwise
    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("💬 Chat relay starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
