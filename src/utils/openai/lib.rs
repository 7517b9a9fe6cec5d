use crate::types::OpenAiContext;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::AUTHORIZATION;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request to the generation api failed: {0}")]
    RequestFailed(String),
    #[error("generation api returned {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("failed to decode generation api response: {0}")]
    InvalidResponse(String),
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ImageGenerationResponse {
    data: Vec<GeneratedImage>,
}

#[derive(Deserialize)]
struct GeneratedImage {
    b64_json: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

async fn post<T: DeserializeOwned>(
    cfg: &OpenAiContext,
    route: &str,
    body: serde_json::Value,
) -> Result<T, Error> {
    let res = cfg
        .client
        .post(format!("{}{}", cfg.api_endpoint.trim_end_matches('/'), route))
        .header(AUTHORIZATION, format!("Bearer {}", cfg.api_key))
        .json(&body)
        .send()
        .await
        .map_err(|err| {
            tracing::error!("Failed to send request to {}: {:?}", route, err);
            Error::RequestFailed(err.to_string())
        })?;

    let status = res.status();
    let data = res
        .text()
        .await
        .map_err(|err| Error::RequestFailed(err.to_string()))?;

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorResponse>(&data)
            .map(|res| res.error.message)
            .unwrap_or(data);
        tracing::error!("Request to {} failed with status {}: {}", route, status, message);
        return Err(Error::ApiError {
            status: status.as_u16(),
            message,
        });
    }

    serde_json::from_str::<T>(&data).map_err(|err| {
        tracing::error!("Failed to deserialize response from {}: {:?}", route, err);
        Error::InvalidResponse(err.to_string())
    })
}

/// Asks the chat model for a JSON object and returns the raw message content.
pub async fn chat_json(cfg: &OpenAiContext, system: &str, user: &str) -> Result<String, Error> {
    let res = post::<ChatCompletionResponse>(
        cfg,
        "/chat/completions",
        json!({
            "model": cfg.recipe_model,
            "response_format": { "type": "json_object" },
            "messages": [
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
        }),
    )
    .await?;

    res.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| Error::InvalidResponse(String::from("completion has no content")))
}

/// Generates a single square image and returns its decoded bytes.
pub async fn generate_image(cfg: &OpenAiContext, prompt: &str) -> Result<Vec<u8>, Error> {
    let res = post::<ImageGenerationResponse>(
        cfg,
        "/images/generations",
        json!({
            "model": cfg.image_model,
            "prompt": prompt,
            "n": 1,
            "size": "1024x1024",
            "response_format": "b64_json",
        }),
    )
    .await?;

    let encoded = res
        .data
        .into_iter()
        .next()
        .and_then(|image| image.b64_json)
        .ok_or_else(|| Error::InvalidResponse(String::from("no image data returned")))?;

    BASE64_STANDARD
        .decode(encoded)
        .map_err(|err| Error::InvalidResponse(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn openai_context(server: &MockServer) -> OpenAiContext {
        OpenAiContext {
            api_key: String::from("sk-test"),
            api_endpoint: format!("{}/v1/", server.uri()),
            recipe_model: String::from("gpt-4o-mini"),
            image_model: String::from("dall-e-3"),
            client: reqwest::Client::new(),
        }
    }

    #[tokio::test]
    async fn chat_json_returns_message_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": "gpt-4o-mini",
                "response_format": { "type": "json_object" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "{\"title\":\"Pasta\"}" },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&server)
            .await;

        let content = chat_json(&openai_context(&server), "system", "pasta")
            .await
            .unwrap();

        assert_eq!(content, "{\"title\":\"Pasta\"}");
    }

    #[tokio::test]
    async fn api_errors_carry_status_and_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Invalid API key", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = chat_json(&openai_context(&server), "system", "pasta")
            .await
            .unwrap_err();

        match err {
            Error::ApiError { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid API key");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_choices_are_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = chat_json(&openai_context(&server), "system", "pasta")
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn generate_image_decodes_base64_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/images/generations"))
            .and(body_partial_json(json!({
                "model": "dall-e-3",
                "prompt": "a bowl of pasta",
                "response_format": "b64_json"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1_700_000_000,
                "data": [{ "b64_json": BASE64_STANDARD.encode(b"png-bytes") }]
            })))
            .mount(&server)
            .await;

        let bytes = generate_image(&openai_context(&server), "a bowl of pasta")
            .await
            .unwrap();

        assert_eq!(bytes, b"png-bytes");
    }
}
