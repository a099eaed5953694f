//! services/api/src/adapters/assistant.rs
//!
//! This module contains the adapter for the site's chat-widget assistant.
//! It implements the `AssistantService` port from the `core` crate by
//! forwarding the widget's conversation to an OpenAI-compatible LLM and
//! relaying the token stream back verbatim.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    error::OpenAIError,
    Client,
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use site_core::{
    domain::ChatTurn,
    ports::{AssistantService, ChatStream, PortError, PortResult},
};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `AssistantService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiAssistantAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiAssistantAdapter {
    /// Creates a new `OpenAiAssistantAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

/// Maps one widget message onto the typed request message for its role.
/// Unknown roles are treated as user messages rather than rejected.
fn to_request_message(turn: &ChatTurn) -> Result<ChatCompletionRequestMessage, OpenAIError> {
    let message = match turn.role.as_str() {
        "system" => ChatCompletionRequestSystemMessageArgs::default()
            .content(turn.content.clone())
            .build()?
            .into(),
        "assistant" => ChatCompletionRequestAssistantMessageArgs::default()
            .content(turn.content.clone())
            .build()?
            .into(),
        _ => ChatCompletionRequestUserMessageArgs::default()
            .content(turn.content.clone())
            .build()?
            .into(),
    };
    Ok(message)
}

//=========================================================================================
// `AssistantService` Trait Implementation
//=========================================================================================

#[async_trait]
impl AssistantService for OpenAiAssistantAdapter {
    /// Forwards the conversation and returns the answer as a token stream.
    /// Errors after the stream has started terminate it with a final `Err`.
    async fn stream_chat(&self, messages: &[ChatTurn]) -> PortResult<ChatStream> {
        let request_messages = messages
            .iter()
            .map(to_request_message)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .stream(true)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let mut upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let tokens = stream! {
            while let Some(chunk) = upstream.next().await {
                match chunk {
                    Ok(response) => {
                        if let Some(choice) = response.choices.into_iter().next() {
                            if let Some(content) = choice.delta.content {
                                if !content.is_empty() {
                                    yield Ok(content);
                                }
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(PortError::Unexpected(e.to_string()));
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(tokens))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: &str, content: &str) -> ChatTurn {
        ChatTurn {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn maps_widget_roles_onto_typed_request_messages() {
        let system = to_request_message(&turn("system", "be brief")).unwrap();
        assert!(matches!(system, ChatCompletionRequestMessage::System(_)));

        let assistant = to_request_message(&turn("assistant", "hello")).unwrap();
        assert!(matches!(
            assistant,
            ChatCompletionRequestMessage::Assistant(_)
        ));

        let user = to_request_message(&turn("user", "hi")).unwrap();
        assert!(matches!(user, ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn unknown_roles_become_user_messages() {
        let mapped = to_request_message(&turn("moderator", "ping")).unwrap();
        assert!(matches!(mapped, ChatCompletionRequestMessage::User(_)));
    }
}
