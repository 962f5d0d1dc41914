use std::sync::Arc;

use futures_util::StreamExt;
use offchat_llm_api::{GenerationParams, InferenceClient, InferenceError};

use crate::history::ConversationManager;

/// One prompt/response step against an inference service.
///
/// The history is only touched after generation succeeds, so a failed
/// call leaves it exactly as it was.
#[derive(Clone)]
pub struct ChatExchange {
    client: Arc<dyn InferenceClient>,
    params: GenerationParams,
}

impl ChatExchange {
    pub fn new(client: Arc<dyn InferenceClient>, params: GenerationParams) -> Self {
        Self { client, params }
    }

    /// Generate a reply to `user_input` and record both turns.
    pub async fn respond(
        &self,
        history: &mut ConversationManager,
        user_input: &str,
    ) -> Result<String, InferenceError> {
        let prompt = history.build_prompt(user_input);
        let reply = self.client.generate(&prompt, &self.params).await?;
        let reply = reply.trim().to_string();

        history.add_user_message(user_input);
        history.add_assistant_message(&reply);
        Ok(reply)
    }

    /// Like [`respond`](Self::respond), handing each fragment to
    /// `on_fragment` as it arrives.
    pub async fn respond_streaming<F>(
        &self,
        history: &mut ConversationManager,
        user_input: &str,
        mut on_fragment: F,
    ) -> Result<String, InferenceError>
    where
        F: FnMut(&str) + Send,
    {
        let prompt = history.build_prompt(user_input);
        let mut stream = self.client.generate_stream(&prompt, &self.params).await?;

        let mut full = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            on_fragment(&fragment);
            full.push_str(&fragment);
        }
        let reply = full.trim().to_string();

        history.add_user_message(user_input);
        history.add_assistant_message(&reply);
        Ok(reply)
    }
}
