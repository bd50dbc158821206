use async_trait::async_trait;
use textloom::v1::GenerationMeta;
use tokio::sync::mpsc;

/// A streaming text-completion service.
///
/// Implementations push text to `deltas` as it arrives and return the full
/// completion, or a human-readable reason on failure. Cancellation is the
/// caller's business: the returned future is simply dropped.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn stream(
        &self,
        prompt: &str,
        params: &GenerationMeta,
        deltas: mpsc::UnboundedSender<String>,
    ) -> Result<String, String>;
}
