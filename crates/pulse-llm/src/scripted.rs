use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::GenerationError;
use crate::types::GenerationRequest;
use crate::{Result, TextGenerator};

/// Generator that replays canned replies in order and records every request.
///
/// Once the script runs out it keeps returning the fallback reply.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    fallback: String,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `text` to every request.
    pub fn always(text: impl Into<String>) -> Self {
        Self {
            fallback: text.into(),
            ..Self::default()
        }
    }

    pub fn then_reply(self, text: impl Into<String>) -> Self {
        self.push(Ok(text.into()))
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, item: std::result::Result<String, String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(item);
        }
        self
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, req: GenerationRequest) -> Result<String> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(req);
        }
        let next = self
            .replies
            .lock()
            .map_err(|_| GenerationError::Other("script lock poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(GenerationError::Other(message)),
            None => Ok(self.fallback.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_then_falls_back() {
        let gen = ScriptedGenerator::always("default")
            .then_reply("first")
            .then_fail("boom");
        let req = GenerationRequest::new("p", 1, 0.0);
        assert_eq!(gen.generate(req.clone()).await.unwrap(), "first");
        assert!(gen.generate(req.clone()).await.is_err());
        assert_eq!(gen.generate(req).await.unwrap(), "default");
        assert_eq!(gen.requests().len(), 3);
    }
}
