//! Main entry point for the marquee_server backend.
//!
//! Loads configuration, installs structured logging, connects to Postgres and
//! serves the catalog API until Ctrl-C.

use actix_web::{App, HttpServer, web};
use dotenv::dotenv;
use marquee::{
    AppState, RequestLoggingMiddleware, Settings, config, get_subscriber, handlers,
    init_subscriber,
};
use tracing_actix_web::TracingLogger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let settings = Settings::from_env()?;

    let subscriber = get_subscriber(
        "marquee".to_string(),
        settings.log_filter.clone(),
        std::io::stdout,
    );
    init_subscriber(subscriber)?;
    config::set_environment(settings.environment);

    let app_state = AppState::new(&settings).await?;

    tracing::info!(
        host = %settings.host,
        port = settings.port,
        environment = settings.environment.as_str(),
        "Starting server"
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .wrap(TracingLogger::default())
            .wrap(RequestLoggingMiddleware::new())
            .configure(handlers::configure_routes)
            .default_service(web::route().to(handlers::not_found))
    })
    .bind((settings.host.as_str(), settings.port))?
    .run();

    let srv_handle = server.handle();
    let server_task = tokio::spawn(server);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Shutdown signal received");
            srv_handle.stop(true).await;
        }
        res = server_task => {
            match res {
                Ok(Err(e)) => tracing::error!("Server failed: {}", e),
                Err(e) => tracing::error!("Server task failed: {}", e),
                Ok(Ok(())) => {}
            }
        }
    }

    Ok(())
}
