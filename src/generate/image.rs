//! Image generation through an OpenAI-style `/v1/images/generations` endpoint.
//!
//! The image comes back base64-encoded in the JSON body and is handed on as
//! a `data:image/png;base64,...` URI, so nothing is stored on disk.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ImageConfig;
use crate::editor::ImageRef;
use crate::llm::LlmError;

/// One image request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub steps: u32,
}

impl ImageRequest {
    /// Request for `prompt` with the configured size and step count.
    pub fn new(prompt: impl Into<String>, config: &ImageConfig) -> Self {
        Self {
            prompt: prompt.into(),
            width: config.width,
            height: config.height,
            steps: config.steps,
        }
    }
}

/// Image generation boundary.
#[async_trait]
pub trait ImageGeneration: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, LlmError>;
}

pub struct ImageGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl ImageGenerator {
    pub fn from_config(config: &ImageConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/images/generations", self.base_url)
    }

    pub fn request_body(&self, request: &ImageRequest) -> serde_json::Value {
        serde_json::json!({
            "model":           self.model,
            "prompt":          request.prompt,
            "width":           request.width,
            "height":          request.height,
            "steps":           request.steps,
            "n":               1,
            "response_format": "b64_json"
        })
    }
}

#[async_trait]
impl ImageGeneration for ImageGenerator {
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageRef, LlmError> {
        let mut req = self
            .client
            .post(self.endpoint())
            .json(&self.request_body(request));

        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        log::debug!("image: requesting {}x{} from {}", request.width, request.height, self.model);

        let response = req.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::from_status(status));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        image_from_response(&json, request)
    }
}

/// Build an [`ImageRef`] from `data[0].b64_json`.
pub fn image_from_response(
    json: &serde_json::Value,
    request: &ImageRequest,
) -> Result<ImageRef, LlmError> {
    let b64 = json["data"][0]["b64_json"]
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(LlmError::EmptyResponse)?;

    Ok(ImageRef::new(format!("data:image/png;base64,{b64}"))
        .with_alt(request.prompt.clone())
        .with_size(request.width, request.height))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ImageRequest {
        ImageRequest::new("un gato", &ImageConfig::default())
    }

    #[test]
    fn request_uses_configured_defaults() {
        let req = request();
        assert_eq!((req.width, req.height, req.steps), (512, 512, 1));
    }

    #[test]
    fn body_shape() {
        let generator = ImageGenerator::from_config(&ImageConfig::default());
        let body = generator.request_body(&request());

        assert_eq!(body["model"], "black-forest-labs/FLUX.1-schnell-Free");
        assert_eq!(body["prompt"], "un gato");
        assert_eq!(body["width"], 512);
        assert_eq!(body["steps"], 1);
        assert_eq!(body["n"], 1);
        assert_eq!(body["response_format"], "b64_json");
        assert_eq!(
            generator.endpoint(),
            "https://api.together.xyz/v1/images/generations"
        );
    }

    #[test]
    fn response_becomes_data_uri() {
        let json = serde_json::json!({ "data": [{ "b64_json": "iVBORw0KGgo=" }] });
        let image = image_from_response(&json, &request()).unwrap();

        assert_eq!(image.src, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.alt, "un gato");
        assert_eq!(image.width, Some(512));
    }

    #[test]
    fn missing_image_is_empty_response() {
        let json = serde_json::json!({ "data": [] });
        assert!(matches!(
            image_from_response(&json, &request()),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn empty_api_key_is_dropped() {
        let config = ImageConfig {
            api_key: Some(String::new()),
            ..ImageConfig::default()
        };
        assert!(ImageGenerator::from_config(&config).api_key.is_none());
    }

    fn generator_for(server: &mockito::Server) -> ImageGenerator {
        ImageGenerator::from_config(&ImageConfig {
            base_url: server.url(),
            api_key: Some("tg-1".into()),
            ..ImageConfig::default()
        })
    }

    #[tokio::test]
    async fn generated_image_arrives_as_data_uri() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/images/generations")
            .match_header("authorization", "Bearer tg-1")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"data":[{"b64_json":"iVBORw0KGgo="}]}"#)
            .create_async()
            .await;

        let image = generator_for(&server).generate_image(&request()).await.unwrap();

        assert_eq!(image.src, "data:image/png;base64,iVBORw0KGgo=");
        assert_eq!(image.alt, "un gato");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn image_endpoint_429_is_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/images/generations")
            .with_status(429)
            .create_async()
            .await;

        let result = generator_for(&server).generate_image(&request()).await;

        assert!(matches!(result, Err(LlmError::RateLimited)), "{result:?}");
    }

    #[tokio::test]
    async fn image_endpoint_garbage_is_parse_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/v1/images/generations")
            .with_status(200)
            .with_body("<html>bad gateway</html>")
            .create_async()
            .await;

        let result = generator_for(&server).generate_image(&request()).await;

        assert!(matches!(result, Err(LlmError::Parse(_))), "{result:?}");
    }
}
