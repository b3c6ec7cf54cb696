//! Reply generation
//!
//! The generator is an opaque async capability. The bundled [`CannedGenerator`]
//! answers instantly with a fixed reply; real backends plug in through
//! [`MessageGenerator`].

use std::time::Duration;

use futures::future::{self, BoxFuture, FutureExt};

use crate::panel::ConversationTurn;

/// Errors a generator can report
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerateError {
    #[error("generation failed: {0}")]
    Failed(String),

    #[error("no reply within {}s", .0.as_secs())]
    TimedOut(Duration),

    #[error("generator returned an empty reply")]
    Empty,
}

/// Produces the next responder turn for a conversation
pub trait MessageGenerator: Send + Sync {
    fn generate(&self, history: Vec<ConversationTurn>) -> BoxFuture<'static, Result<String, GenerateError>>;
}

/// Always replies with the same text
#[derive(Debug, Clone)]
pub struct CannedGenerator {
    reply: String,
}

impl CannedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self { reply: reply.into() }
    }
}

impl Default for CannedGenerator {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CANNED_REPLY)
    }
}

impl MessageGenerator for CannedGenerator {
    fn generate(&self, _history: Vec<ConversationTurn>) -> BoxFuture<'static, Result<String, GenerateError>> {
        future::ready(Ok(self.reply.clone())).boxed()
    }
}

/// Run one generation, bounded by `timeout`. Blank replies count as failures.
pub async fn generate_with_timeout(
    generator: &dyn MessageGenerator,
    history: Vec<ConversationTurn>,
    timeout: Duration,
) -> Result<String, GenerateError> {
    let reply = tokio::time::timeout(timeout, generator.generate(history))
        .await
        .map_err(|_| GenerateError::TimedOut(timeout))??;

    if reply.trim().is_empty() {
        return Err(GenerateError::Empty);
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Never;

    impl MessageGenerator for Never {
        fn generate(&self, _history: Vec<ConversationTurn>) -> BoxFuture<'static, Result<String, GenerateError>> {
            future::pending().boxed()
        }
    }

    #[tokio::test]
    async fn test_canned_reply() {
        let generator = CannedGenerator::new("ok then");
        let reply = generate_with_timeout(&generator, Vec::new(), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(reply, "ok then");
    }

    #[tokio::test]
    async fn test_blank_reply_is_error() {
        let generator = CannedGenerator::new("   ");
        let err = generate_with_timeout(&generator, Vec::new(), Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err, GenerateError::Empty);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout() {
        let timeout = Duration::from_secs(5);
        let err = generate_with_timeout(&Never, Vec::new(), timeout).await.unwrap_err();
        assert_eq!(err, GenerateError::TimedOut(timeout));
    }
}
