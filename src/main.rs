//! Payment reconciler service entry point.
//!
//! Wires the Postgres repository, Redis streams, the Xendit adapter and the
//! user service into the lifecycle service, then runs the HTTP API, the
//! order-created consumer and the four schedulers until Ctrl-C.

use std::sync::Arc;

use payment_reconciler::adapters::document::LocalInvoiceDocumentGenerator;
use payment_reconciler::adapters::events::{RedisOrderConsumer, RedisStreamPublisher};
use payment_reconciler::adapters::http::{payment_router, PaymentAppState};
use payment_reconciler::adapters::postgres::PostgresPaymentRepository;
use payment_reconciler::adapters::user_service::HttpUserDirectory;
use payment_reconciler::adapters::xendit::XenditInvoiceAdapter;
use payment_reconciler::application::{
    ExpirySweeper, FailedRequestRecoverer, HandleOrderCreatedHandler, InvoiceIssuer,
    PaymentLifecycleService, PendingInvoiceChecker, PendingRequestProcessor, ScheduledJob,
    SchedulerSupervisor,
};
use payment_reconciler::config::AppConfig;
use payment_reconciler::ports::{InvoiceProvider, PaymentRepository};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Database migrations applied");
    }

    let redis_client = redis::Client::open(config.redis.url.clone())?;
    let publish_conn = redis_client.get_multiplexed_tokio_connection().await?;
    // XREADGROUP BLOCK holds its connection, so the consumer gets its own.
    let consume_conn = redis_client.get_multiplexed_tokio_connection().await?;

    let repository: Arc<dyn PaymentRepository> = Arc::new(PostgresPaymentRepository::new(pool));
    let publisher = Arc::new(
        RedisStreamPublisher::new(publish_conn).with_max_len(config.redis.stream_max_len),
    );
    let invoice_provider: Arc<dyn InvoiceProvider> =
        Arc::new(XenditInvoiceAdapter::new(config.invoice.xendit_config())?);
    let user_directory = Arc::new(HttpUserDirectory::new(
        config.user_service.base_url.clone(),
        config.user_service.timeout(),
    )?);

    let lifecycle = Arc::new(
        PaymentLifecycleService::new(repository.clone(), publisher)
            .with_retry_policy(config.retry.retry_policy()),
    );
    let issuer = Arc::new(
        InvoiceIssuer::new(repository.clone(), invoice_provider.clone(), user_directory)
            .with_description_prefix(config.invoice.description_prefix.clone()),
    );

    let scheduler_config = config.scheduler.scheduler_config();
    let jobs: Vec<Arc<dyn ScheduledJob>> = if config.scheduler.enabled {
        vec![
            Arc::new(PendingRequestProcessor::new(
                repository.clone(),
                issuer.clone(),
                &scheduler_config,
            )),
            Arc::new(FailedRequestRecoverer::new(repository.clone(), &scheduler_config)),
            Arc::new(PendingInvoiceChecker::new(
                repository.clone(),
                invoice_provider.clone(),
                lifecycle.clone(),
                &scheduler_config,
            )),
            Arc::new(ExpirySweeper::new(
                repository.clone(),
                lifecycle.clone(),
                &scheduler_config,
            )),
        ]
    } else {
        tracing::info!("Schedulers disabled");
        Vec::new()
    };
    let supervisor = SchedulerSupervisor::start(jobs);

    let (consumer_shutdown_tx, consumer_shutdown_rx) = watch::channel(false);
    let consumer_task = if config.features.consume_order_events {
        let mut order_handler = HandleOrderCreatedHandler::new(lifecycle.clone());
        if config.features.create_invoice_directly {
            order_handler = order_handler.with_direct_invoicing(issuer.clone());
        }
        let consumer = RedisOrderConsumer::new(
            consume_conn,
            Arc::new(order_handler),
            config.order_consumer_config(),
        );
        Some(tokio::spawn(async move {
            if let Err(err) = consumer.run(consumer_shutdown_rx).await {
                tracing::error!(error = %err, "Order consumer stopped");
            }
        }))
    } else {
        None
    };

    let state = PaymentAppState {
        lifecycle,
        invoice_provider,
        document_generator: Arc::new(LocalInvoiceDocumentGenerator::new(
            config.documents.output_dir.clone(),
        )),
        report_max_retry: config.report_max_retry(),
    };
    let app = payment_router(state, config.server.request_timeout());

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, jobs = supervisor.job_count(), "Payment reconciler listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    let _ = consumer_shutdown_tx.send(true);
    if let Some(task) = consumer_task {
        if let Err(err) = task.await {
            tracing::error!(error = %err, "Order consumer task panicked");
        }
    }
    supervisor.shutdown().await;
    Ok(())
}

/// `RUST_LOG` wins over the configured filter. JSON output in production.
fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    if config.is_production() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "Failed to listen for shutdown signal");
    }
}
