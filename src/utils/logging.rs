use std::{fmt::Debug, future::Future, time::Instant};
use tracing::Instrument;

/// Runs `operation` inside an `operation` span tagged with the request id.
/// The result is handed back untouched.
pub async fn log_operation<F, T, E>(
    name: &'static str,
    request_id: &str,
    operation: F,
) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    E: Debug,
{
    let span = tracing::info_span!("operation", name, request_id);

    async move {
        let started_at = Instant::now();
        tracing::info!("Starting {}", name);

        let result = operation.await;
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => tracing::info!(elapsed_ms, "Completed {}", name),
            Err(err) => tracing::error!(elapsed_ms, "Failed {}: {:?}", name, err),
        }

        result
    }
    .instrument(span)
    .await
}
