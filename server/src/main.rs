use hyper_util::rt::TokioIo;
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use pagesmith_server::store::local::LocalFileStore;
use pagesmith_server::store::sqlite::SqliteProjectStore;
use pagesmith_server::{
    ChatCompletions, ModelRegistry, ProjectStore, ServerConfig, ServerState, StoreKind,
    UpstreamClient, server,
};
use std::error::Error;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tower::Service;
use tracing::{debug, error, info, warn};

type BoxError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pagesmith_server=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env().inspect_err(|e| error!("Invalid configuration: {}", e))?;

    // Storage layout:
    //   - pagesmith.db (SQLite store)
    //   - projects/ (local JSON store)
    std::fs::create_dir_all(&config.storage_dir)?;
    let store: Box<dyn ProjectStore> = match config.store {
        StoreKind::Sqlite => Box::new(SqliteProjectStore::new(config.storage_dir.join("pagesmith.db"))?),
        StoreKind::Local => Box::new(LocalFileStore::new(config.storage_dir.join("projects"))?),
    };

    let models = ModelRegistry::new(config.models.clone(), config.default_model.clone())
        .ok_or("no generation models enabled")?;

    let upstream: Option<Arc<dyn ChatCompletions>> = match &config.api_key {
        Some(api_key) => {
            let http = reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(30))
                .build()?;
            Some(Arc::new(UpstreamClient::new(
                http,
                config.upstream_url.clone(),
                api_key.clone(),
                config.max_tokens,
            )))
        }
        None => {
            warn!("PAGESMITH_API_KEY is not set, generation requests will be refused");
            None
        }
    };

    let state = Arc::new(ServerState::new(models, store, upstream));
    debug!("Server state: {:?}", state);

    // Create and run the server
    let app = server::create_app(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Pagesmith server listening on http://{} (HTTP/1.1 + HTTP/2)", config.bind_addr);
    info!("Storage directory: {}", config.storage_dir.display());

    // Use hyper's auto-negotiating server to support both HTTP/1.1 and HTTP/2
    let conn_builder = ConnBuilder::new(hyper_util::rt::TokioExecutor::new());

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!("Failed to accept connection: {}", e);
                continue;
            }
        };
        debug!("New connection from: {}", addr);
        let io = TokioIo::new(stream);
        let app_clone = app.clone();
        let conn_builder = conn_builder.clone();

        tokio::spawn(async move {
            if let Err(err) = conn_builder
                .serve_connection(
                    io,
                    hyper::service::service_fn(move |req| app_clone.clone().call(req)),
                )
                .await
            {
                // Check if the error is an io::Error indicating a normal close
                let is_normal_close = err
                    .source()
                    .and_then(|e| e.downcast_ref::<io::Error>())
                    .map(|io_err| {
                        matches!(
                            io_err.kind(),
                            io::ErrorKind::ConnectionReset
                                | io::ErrorKind::BrokenPipe
                                | io::ErrorKind::UnexpectedEof
                        )
                    })
                    .unwrap_or(false);

                if is_normal_close {
                    debug!("Connection from {} closed normally", addr);
                } else {
                    error!("Error serving connection from {}: {}", addr, err);
                }
            } else {
                debug!("Connection from {} completed successfully", addr);
            }
        });
    }
}
