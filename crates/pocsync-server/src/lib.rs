//!
//! Pocsync Server - HTTP ingress and queue consumers for the Pocsync
//! webhook automation platform.
//!

use std::sync::Arc;

/// API module
pub mod api;

/// Configuration module
pub mod config;

/// Queue consumers
pub mod consumers;

/// Error module
pub mod error;

// Re-export key types
pub use api::AppState;
pub use config::ServerConfig;
pub use consumers::{EventConsumer, PipelineConsumer};
pub use error::{ServerError, ServerResult};

use pocsync_broker::{AmqpBroker, MessageBroker};
use pocsync_core::{
    EventRouter, InMemoryPipelineDirectory, IntegrationRegistry, JsonMap, Pipeline,
    PipelineDirectory, PipelineExecutor, PipelineStatus, RouteRule, Step, StepType,
};
use serde_json::json;
use tracing::{error, info};

/// Run function
pub async fn run(config: ServerConfig) -> ServerResult<()> {
    init_logging(&config);

    // Create dependencies
    let registry = Arc::new(IntegrationRegistry::new());
    pocsync_actions::register_builtin(&registry).await;

    let broker: Arc<dyn MessageBroker> = Arc::new(AmqpBroker::new(config.amqp_url.clone()));
    let directory: Arc<dyn PipelineDirectory> =
        Arc::new(InMemoryPipelineDirectory::with_pipelines(demo_pipelines()));
    let router = Arc::new(EventRouter::new(default_route_rules(&config)));
    let executor = Arc::new(PipelineExecutor::new(registry.clone()));

    // Start the event consumer pool
    let event_consumer = Arc::new(EventConsumer::new(
        broker.clone(),
        directory.clone(),
        router.clone(),
        config.event_queue.clone(),
        config.consumer_concurrency,
        config.consumer_prefetch,
    ));
    tokio::spawn(async move {
        if let Err(err) = event_consumer.run().await {
            error!(error = %err, "event consumer terminated");
        }
    });

    // One pipeline consumer pool per routed queue
    for queue in routed_queues(&config) {
        let pipeline_consumer = Arc::new(PipelineConsumer::new(
            broker.clone(),
            executor.clone(),
            queue,
            config.consumer_concurrency,
            config.consumer_prefetch,
        ));
        tokio::spawn(async move {
            if let Err(err) = pipeline_consumer.run().await {
                error!(error = %err, "pipeline consumer terminated");
            }
        });
    }

    // Serve the ingress API
    let state = Arc::new(AppState {
        broker,
        directory,
        registry,
        executor,
        router,
        event_queue: config.event_queue.clone(),
    });
    let app = api::build_router(state);

    let address = format!("{}:{}", config.bind_address, config.port);
    info!(%address, "starting ingress server");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app)
        .await
        .map_err(|err| ServerError::InternalError(err.to_string()))?;

    Ok(())
}

/// Initialize logging
fn init_logging(config: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    fmt().with_env_filter(filter).with_target(true).init();
}

/// The static routing table: per-tenant queues first, then the default
/// pipeline queue as the catch-all.
pub fn default_route_rules(config: &ServerConfig) -> Vec<RouteRule> {
    vec![
        RouteRule::new(
            "lazada_pipeline_queue",
            pattern(json!({"path": "/api/webhook/lazada"})),
        ),
        RouteRule::default_route(config.pipeline_queue.clone()),
    ]
}

/// Distinct queues named by the routing table.
fn routed_queues(config: &ServerConfig) -> Vec<String> {
    let mut queues: Vec<String> = default_route_rules(config)
        .into_iter()
        .map(|rule| rule.queue)
        .collect();
    queues.dedup();
    queues
}

/// Demo pipelines seeded into the directory at startup. Pipeline storage is
/// an external concern; the directory only needs something to enumerate.
pub fn demo_pipelines() -> Vec<Pipeline> {
    let lazada = Pipeline::new(
        "lazada order sync",
        pattern(json!({"source": "webhook", "path": "/api/webhook/lazada"})),
        vec![
            Step::new(
                "webhook trigger",
                StepType::Trigger,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::WEBHOOK_TRIGGER,
                JsonMap::new(),
                0,
            ),
            Step::new(
                "map order fields",
                StepType::Action,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::MAP_FIELDS,
                pattern(json!({"mapping": {"order_id": "id", "status": "state"}})),
                1,
            ),
            Step::new(
                "log result",
                StepType::Output,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::LOG_MESSAGE,
                pattern(json!({"level": "info"})),
                2,
            ),
        ],
    )
    .with_description("Maps Lazada order webhooks into the canonical shape")
    .with_status(PipelineStatus::Active);

    let shopee = Pipeline::new(
        "shopee order log",
        pattern(json!({"source": "webhook", "path": "/api/webhook/shopee"})),
        vec![
            Step::new(
                "webhook trigger",
                StepType::Trigger,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::WEBHOOK_TRIGGER,
                JsonMap::new(),
                0,
            ),
            Step::new(
                "log order",
                StepType::Output,
                pocsync_actions::BUILTIN_INTEGRATION,
                pocsync_actions::LOG_MESSAGE,
                pattern(json!({"level": "info"})),
                1,
            ),
        ],
    )
    .with_description("Logs incoming Shopee order webhooks")
    .with_status(PipelineStatus::Active);

    vec![lazada, shopee]
}

fn pattern(value: serde_json::Value) -> JsonMap {
    value.as_object().cloned().unwrap_or_default()
}
