//! VERITAS Engine Entry Point
//!
//! Reads one JSON `MessageRecord` per line from stdin, stores it, runs both
//! detection tracks through the job queues and prints every detection as a
//! JSON line on stdout. Logs go to stderr.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinSet;
use veritas_core::{
    JobOutput, JobPayload, MessageRecord, PipelineConfig, ProviderSettings, VeritasResult,
    WebSearchService,
};
use veritas_engine::constants::{
    DRIVER_JOB_TIMEOUT_SECS, DRIVER_SHUTDOWN_GRACE_SECS, SERVICE_GENERATION, SERVICE_WEB_ANSWER,
};
use veritas_engine::telemetry::{init_tracing, TelemetryConfig};
use veritas_engine::{
    maintenance_task, JobHandle, JobQueues, PipelineContext, PipelineJobHandler, Upstreams,
};
use veritas_llm::{
    BraveSearchProvider, OpenAIClient, OpenAIGenerationProvider, PerplexityAnswerProvider,
};
use veritas_storage::InMemoryMessageStore;

#[tokio::main]
async fn main() -> VeritasResult<()> {
    let telemetry_config = TelemetryConfig::from_env();
    if let Err(e) = init_tracing(&telemetry_config) {
        eprintln!("tracing disabled: {}", e);
    }

    let config = PipelineConfig::from_env()?;
    let providers = ProviderSettings::from_env()?;
    tracing::info!(?providers, "Configuration loaded");

    let ctx = Arc::new(PipelineContext::new(
        config.clone(),
        Arc::new(InMemoryMessageStore::new()),
        build_upstreams(&providers),
    ));

    let handler = Arc::new(PipelineJobHandler::new(Arc::clone(&ctx)));
    let queues = JobQueues::start(&config.queues, handler);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let maintenance = tokio::spawn(maintenance_task(
        Arc::clone(&ctx),
        config.maintenance.clone(),
        shutdown_rx,
    ));

    let mut pending = JoinSet::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown signal received");
                break;
            }
        };

        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::error!(error = %e, "Failed to read stdin");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let record: MessageRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(error = %e, "Skipping malformed input line");
                continue;
            }
        };

        if let Err(e) = ctx.ingest(&record).await {
            tracing::warn!(message_id = record.id, error = %e, "Message not ingested");
            continue;
        }

        let payloads = [
            JobPayload::ContradictionCheck {
                message: record.clone(),
            },
            JobPayload::MisinformationCheck { message: record },
        ];
        for payload in payloads {
            match queues.submit_default(payload) {
                Ok(handle) => {
                    pending.spawn(print_detection(handle));
                }
                Err(e) => tracing::error!(error = %e, "Failed to submit detection job"),
            }
        }
    }

    while pending.join_next().await.is_some() {}

    let drained = tokio::time::timeout(
        Duration::from_secs(DRIVER_SHUTDOWN_GRACE_SECS),
        queues.shutdown(),
    )
    .await;
    if drained.is_err() {
        tracing::warn!("Job queues did not drain before the grace period ended");
    }

    let _ = shutdown_tx.send(true);
    if let Err(e) = maintenance.await {
        tracing::warn!(error = %e, "Maintenance task failed");
    }

    match serde_json::to_string(&ctx.health()) {
        Ok(health) => tracing::info!(%health, "Pipeline stopped"),
        Err(e) => tracing::warn!(error = %e, "Pipeline stopped; health not serializable"),
    }
    Ok(())
}

fn build_upstreams(providers: &ProviderSettings) -> Upstreams {
    let generation_client = OpenAIClient::new(
        SERVICE_GENERATION,
        providers.generation_api_key.clone(),
        providers.requests_per_minute,
    )
    .with_base_url(providers.generation_base_url.clone())
    .with_timeout(providers.request_timeout);

    let answer_key = providers
        .answer_api_key
        .as_ref()
        .unwrap_or(&providers.generation_api_key)
        .clone();
    let answer_client =
        OpenAIClient::new(SERVICE_WEB_ANSWER, answer_key, providers.requests_per_minute)
            .with_base_url(providers.answer_base_url.clone())
            .with_timeout(providers.request_timeout);

    let web_search = providers.search_api_key.as_ref().map(|key| {
        Arc::new(
            BraveSearchProvider::new(key.clone())
                .with_base_url(providers.search_base_url.clone())
                .with_timeout(providers.request_timeout),
        ) as Arc<dyn WebSearchService>
    });

    Upstreams {
        generation: Arc::new(OpenAIGenerationProvider::new(generation_client)),
        web_answer: Arc::new(PerplexityAnswerProvider::new(
            answer_client,
            providers.answer_model.clone(),
        )),
        web_search,
    }
}

async fn print_detection(handle: JobHandle) {
    let output = handle
        .await_completion(Duration::from_secs(DRIVER_JOB_TIMEOUT_SECS))
        .await;
    if let Some(JobOutput::Detection(Some(result))) = output {
        match serde_json::to_string(&result) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to serialize detection"),
        }
    }
}
