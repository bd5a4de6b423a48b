use async_trait::async_trait;

use crate::Result;

use super::types::{Completion, CompletionRequest};

/// Backend completion service.
///
/// Streaming is callback-based: `on_partial` receives the accumulated answer
/// text each time the backend produces more of it, zero or more times before
/// the call resolves. Implementations drive their own read loops.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(
        &self,
        req: CompletionRequest,
        on_partial: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<Completion>;
}
