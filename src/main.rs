use onboarding_flow::config::{FlowConfig, ServerConfig};
use onboarding_flow::error::Result;
use onboarding_flow::flow::{FlowDefinition, FlowEvent, FlowManager, flow_routes};
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let server_config = ServerConfig::from_env()?;
    let flow_config = FlowConfig::from_env()?;

    let definition = FlowDefinition::load(&server_config.flow_path).unwrap_or_else(|e| {
        eprintln!(
            "Error: Failed to load flow at {}: {}",
            server_config.flow_path.display(),
            e
        );
        eprintln!("  export ONBOARDING_FLOW_PATH=path/to/flow.json");
        std::process::exit(1);
    });
    let (header, state) = definition.into_state()?;

    eprintln!("🧭 Onboarding Flow v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Flow: {} ({} slides)", server_config.flow_path.display(), state.slides().len());
    eprintln!("   Auto-advance: {:?}", flow_config.auto_advance_delay);
    eprintln!("   API: http://0.0.0.0:{}/api/flow", server_config.port);
    eprintln!("   WS: ws://0.0.0.0:{}/ws\n", server_config.port);

    let manager = FlowManager::new(state, header, flow_config);

    // Log completion for the host; a real app would close the flow here.
    let mut events = manager.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(FlowEvent::Completed { summary }) => {
                    tracing::info!(
                        session_id = %summary.session_id,
                        answered = summary.selections.len(),
                        "Flow finished"
                    );
                }
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    });

    let app = flow_routes(manager.clone()).layer(CorsLayer::permissive());
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", server_config.port)).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    manager.shutdown().await;
    Ok(())
}
