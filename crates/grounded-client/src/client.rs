//! HTTP client for the grounded messaging API
//!
//! | operation | route |
//! |---|---|
//! | streaming generate | `POST /messages/generate/stream` |
//! | generate | `POST /messages/generate` |
//! | refine | `POST /messages/{id}/refine` |
//! | edit | `PUT /messages/{id}` |
//! | set status | `PATCH /messages/{id}` |
//! | get | `GET /messages/{id}` |
//! | list | `GET /messages` |
//! | references | `GET /references` |
//!
//! Non-success responses become [`MessageError::RequestRejected`] with the
//! body kept verbatim. A success body that does not decode is
//! [`MessageError::Decode`]. Connection failures on the event stream, whether
//! at open or mid-stream, are [`StreamError::Transport`]. Nothing is retried.

use crate::config::ClientConfig;
use crate::error::{transport, ClientError};
use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use grounded_message::{
    EditRequest, EditResponse, GenerateRequest, GenerationResult, Message, MessageError,
    MessageId, MessageService, MessageStatus, MessageSummary, RefineRequest, RefineResponse,
    ReferenceList, ReferenceSummary, StatusResponse, StatusUpdate,
};
use grounded_stream::{
    consume, consume_until, EventCursor, NoopObserver, ProgressObserver, StreamError,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

/// Byte chunks of an open event stream
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, StreamError>>;

const EVENT_STREAM: &str = "text/event-stream";

/// Client for one API root
#[derive(Debug, Clone)]
pub struct HttpMessageClient {
    http: reqwest::Client,
    config: ClientConfig,
}

impl HttpMessageClient {
    /// Build a client; the configuration is validated first.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let config = config.validated()?;
        // No client-wide timeout: streams stay open as long as the server keeps them open
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Ok(Self { http, config })
    }

    /// Client configured from `GROUNDED_API_URL` and defaults
    pub fn from_env() -> Result<Self, ClientError> {
        Self::new(ClientConfig::from_env()?)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    fn with_default_top_k(&self, request: GenerateRequest) -> Result<GenerateRequest, MessageError> {
        let request = request.validated()?;
        let top_k = request.top_k.unwrap_or(self.config.default_top_k);
        Ok(request.with_top_k(top_k))
    }

    /// Non-streaming request with the configured timeout
    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, self.url(path))
            .timeout(self.config.request_timeout())
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, MessageError> {
        let response = builder.send().await.map_err(|e| transport(&e))?;
        let response = check_status(response).await?;
        let body = response.text().await.map_err(|e| transport(&e))?;
        serde_json::from_str(&body).map_err(|e| {
            tracing::warn!(error = %e, "API response did not decode");
            MessageError::Decode(e.to_string())
        })
    }

    async fn send_body<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, MessageError> {
        self.send_json(self.request(method, path).json(body)).await
    }

    /// Open the generation event stream.
    ///
    /// The returned cursor owns the connection; dropping or closing it
    /// releases the transport.
    pub async fn open_generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<EventCursor<ByteStream>, ClientError> {
        let request = self.with_default_top_k(request)?;
        tracing::debug!(references = request.reference_ids.len(), "Opening generation stream");

        let response = self
            .http
            .post(self.url("/messages/generate/stream"))
            .header(ACCEPT, EVENT_STREAM)
            .json(&request)
            .send()
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))?;
        let response = check_status(response).await?;

        if let Some(content_type) = response.headers().get(CONTENT_TYPE) {
            let is_event_stream = content_type
                .to_str()
                .is_ok_and(|value| value.starts_with(EVENT_STREAM));
            if !is_event_stream {
                tracing::warn!(?content_type, "Generation stream has unexpected content type");
            }
        }

        let chunks: ByteStream = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| StreamError::Transport(e.to_string()))
            })
            .boxed();
        Ok(EventCursor::new(chunks))
    }

    /// Streaming generate reporting every progress state to `observer`
    pub async fn generate_with_progress<O>(
        &self,
        request: GenerateRequest,
        observer: &mut O,
    ) -> Result<GenerationResult, ClientError>
    where
        O: ProgressObserver + Send + ?Sized,
    {
        let mut cursor = self.open_generate_stream(request).await?;
        let result = consume(&mut cursor, observer).await?;
        log_generated(&result);
        Ok(result)
    }

    /// Streaming generate abandoned when `cancel` resolves first
    pub async fn generate_until<O, C>(
        &self,
        request: GenerateRequest,
        observer: &mut O,
        cancel: C,
    ) -> Result<GenerationResult, ClientError>
    where
        O: ProgressObserver + Send + ?Sized,
        C: Future<Output = ()> + Send,
    {
        let mut cursor = self.open_generate_stream(request).await?;
        let result = consume_until(&mut cursor, observer, cancel).await?;
        log_generated(&result);
        Ok(result)
    }

    /// Streaming generate without progress reporting
    pub async fn generate_stream(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerationResult, ClientError> {
        self.generate_with_progress(request, &mut NoopObserver).await
    }

    /// Non-streaming generate
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerationResult, ClientError> {
        let request = self.with_default_top_k(request)?;
        let result: GenerationResult = self
            .send_body(Method::POST, "/messages/generate", &request)
            .await?;
        log_generated(&result);
        Ok(result)
    }

    /// Every reference available for grounding
    pub async fn list_references(&self) -> Result<Vec<ReferenceSummary>, ClientError> {
        let list: ReferenceList = self
            .send_json(self.request(Method::GET, "/references"))
            .await?;
        Ok(list.references)
    }
}

fn log_generated(result: &GenerationResult) {
    match result.message_id {
        Some(id) => tracing::info!(
            message_id = %id,
            claims = result.claims.len(),
            warnings = result.warnings.len(),
            "Generation completed"
        ),
        None => tracing::info!(warnings = result.warnings.len(), "Generation persisted nothing"),
    }
}

async fn check_status(response: Response) -> Result<Response, MessageError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), %body, "API request rejected");
    Err(MessageError::RequestRejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl MessageService for HttpMessageClient {
    async fn refine(
        &self,
        id: MessageId,
        request: RefineRequest,
    ) -> Result<RefineResponse, MessageError> {
        let request = request.validated()?;
        self.send_body(Method::POST, &format!("/messages/{id}/refine"), &request)
            .await
    }

    async fn edit(
        &self,
        id: MessageId,
        request: EditRequest,
    ) -> Result<EditResponse, MessageError> {
        let request = request.validated()?;
        self.send_body(Method::PUT, &format!("/messages/{id}"), &request)
            .await
    }

    async fn set_status(
        &self,
        id: MessageId,
        status: MessageStatus,
    ) -> Result<StatusResponse, MessageError> {
        self.send_body(Method::PATCH, &format!("/messages/{id}"), &StatusUpdate { status })
            .await
    }

    async fn get_message(&self, id: MessageId) -> Result<Message, MessageError> {
        self.send_json(self.request(Method::GET, &format!("/messages/{id}")))
            .await
    }

    async fn list_messages(&self) -> Result<Vec<MessageSummary>, MessageError> {
        self.send_json(self.request(Method::GET, "/messages")).await
    }
}
