use serde::{Deserialize, Serialize};
use viva_model::{ModelFinishReason, ModelMessage, ModelRequest, ModelResponse};

use crate::AnthropicConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    #[serde(other)]
    Unsupported,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    role: Role,
    content: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

// -----------
// Conversions
// -----------

/// Creates the request payload. System messages are lifted out of the
/// history into the top-level `system` field, since the API doesn't accept
/// them in `messages`.
pub fn create_request(
    req: &ModelRequest,
    config: &AnthropicConfig,
) -> MessagesRequest {
    let mut system: Option<String> = None;
    let mut messages = Vec::with_capacity(req.messages.len());
    for msg in &req.messages {
        match msg {
            ModelMessage::System(content) => match &mut system {
                Some(system) => {
                    system.push_str("\n\n");
                    system.push_str(content);
                }
                None => system = Some(content.clone()),
            },
            ModelMessage::User(content) => messages.push(Message {
                role: Role::User,
                content: content.clone(),
            }),
            ModelMessage::Assistant(content) => messages.push(Message {
                role: Role::Assistant,
                content: content.clone(),
            }),
        }
    }
    MessagesRequest {
        model: config.model.clone(),
        max_tokens: config.max_tokens,
        system,
        messages,
    }
}

/// Joins the text blocks of a response, returns `None` if there is no text.
pub fn into_model_response(resp: MessagesResponse) -> Option<ModelResponse> {
    let content: String = resp
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(text),
            ContentBlock::Unsupported => None,
        })
        .collect();
    if content.trim().is_empty() {
        return None;
    }
    let finish_reason = match resp.stop_reason.as_deref() {
        Some("max_tokens") => ModelFinishReason::MaxTokens,
        _ => ModelFinishReason::Stop,
    };
    Some(ModelResponse {
        content,
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AnthropicConfigBuilder;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are assessing a student.".to_owned()),
                ModelMessage::User("Hi! My name is Ada.".to_owned()),
                ModelMessage::Assistant("What does line 2 do?".to_owned()),
                ModelMessage::System("Be kind.".to_owned()),
                ModelMessage::User("It loops.".to_owned()),
            ],
        };
        let config = AnthropicConfigBuilder::with_api_key("xxx")
            .with_model("custom")
            .with_max_tokens(64)
            .build();
        let expected = MessagesRequest {
            model: "custom".to_owned(),
            max_tokens: 64,
            system: Some("You are assessing a student.\n\nBe kind.".to_owned()),
            messages: vec![
                Message {
                    role: Role::User,
                    content: "Hi! My name is Ada.".to_owned(),
                },
                Message {
                    role: Role::Assistant,
                    content: "What does line 2 do?".to_owned(),
                },
                Message {
                    role: Role::User,
                    content: "It loops.".to_owned(),
                },
            ],
        };
        assert_eq!(create_request(&request, &config), expected);

        let json = serde_json::to_value(&expected).unwrap();
        assert_eq!(json["messages"][1]["role"], "assistant");
    }

    #[test]
    fn test_request_without_system() {
        let request = ModelRequest {
            messages: vec![ModelMessage::User("Hello".to_owned())],
        };
        let config = AnthropicConfigBuilder::with_api_key("xxx").build();
        let json =
            serde_json::to_value(create_request(&request, &config)).unwrap();
        assert!(json.get("system").is_none());
    }

    #[test]
    fn test_parse_response() {
        let resp: MessagesResponse = serde_json::from_str(include_str!(
            "../fixtures/test_response.json"
        ))
        .unwrap();
        let resp = into_model_response(resp).unwrap();
        assert_eq!(
            resp.content,
            "Great to meet you! Let's start with your loop. Why did you use `range(1, n)`?"
        );
        assert_eq!(resp.finish_reason, ModelFinishReason::Stop);
    }

    #[test]
    fn test_empty_response() {
        let resp: MessagesResponse = serde_json::from_str(
            r#"{"content":[{"type":"thinking","thinking":"..."}],"stop_reason":"max_tokens"}"#,
        )
        .unwrap();
        assert_eq!(into_model_response(resp), None);
    }
}
