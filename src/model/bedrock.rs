use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_bedrockruntime::operation::invoke_model::InvokeModelError;
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::Client;
use log::{debug, info};
use serde_json::{json, Value};

use super::{ModelClient, ModelError, ModelReply, ModelRequest};

const ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Anthropic messages models hosted on Amazon Bedrock, called through `InvokeModel`.
pub struct BedrockModel {
    client: Client,
    model_id: String,
}

impl BedrockModel {
    pub async fn new(region: &str, model_id: &str) -> Self {
        info!("Initializing Bedrock runtime client in {}", region);

        // One attempt per request; retrying is left to the caller
        let config = aws_config::load_from_env()
            .await
            .to_builder()
            .region(aws_config::Region::new(region.to_string()))
            .retry_config(RetryConfig::disabled())
            .build();

        Self::from_client(Client::new(&config), model_id)
    }

    pub fn from_client(client: Client, model_id: &str) -> Self {
        Self {
            client,
            model_id: model_id.to_string(),
        }
    }
}

/// Request body in the Anthropic-on-Bedrock messages format.
pub fn request_body(request: &ModelRequest) -> Value {
    json!({
        "anthropic_version": ANTHROPIC_VERSION,
        "max_tokens": request.max_tokens,
        "system": [{ "text": request.system }],
        "messages": request.messages,
        "temperature": request.temperature,
        "top_p": request.top_p,
        "stop_sequences": request.stop_sequences,
    })
}

/// Collapses the SDK's error surface into the closed set the handler understands.
pub fn classify(err: InvokeModelError) -> ModelError {
    let message = err
        .message()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string());

    match err {
        InvokeModelError::AccessDeniedException(_) => ModelError::AccessDenied {
            code: "AccessDeniedException".to_string(),
            message,
        },
        InvokeModelError::ThrottlingException(_) => ModelError::Throttled {
            code: "ThrottlingException".to_string(),
            message,
        },
        InvokeModelError::ValidationException(_) => ModelError::InvalidPayload {
            code: "ValidationException".to_string(),
            message,
        },
        other => ModelError::Unavailable {
            code: other.code().unwrap_or("Unknown").to_string(),
            message,
        },
    }
}

fn from_sdk_error<R>(err: SdkError<InvokeModelError, R>) -> ModelError
where
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match err {
        SdkError::ServiceError(context) => classify(context.into_err()),
        other => {
            let code = match &other {
                SdkError::ConstructionFailure(_) => "ConstructionFailure",
                SdkError::TimeoutError(_) => "TimeoutError",
                SdkError::DispatchFailure(_) => "DispatchFailure",
                SdkError::ResponseError(_) => "ResponseError",
                _ => "SdkError",
            };
            ModelError::Unavailable {
                code: code.to_string(),
                message: DisplayErrorContext(&other).to_string(),
            }
        }
    }
}

#[async_trait]
impl ModelClient for BedrockModel {
    async fn invoke(&self, request: &ModelRequest) -> Result<ModelReply, ModelError> {
        let body = serde_json::to_vec(&request_body(request))
            .map_err(|e| ModelError::Protocol(format!("failed to encode request: {}", e)))?;
        debug!("Bedrock request body: {} bytes", body.len());

        let output = self
            .client
            .invoke_model()
            .model_id(&self.model_id)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(from_sdk_error)?;

        serde_json::from_slice(output.body().as_ref())
            .map_err(|e| ModelError::Protocol(format!("failed to decode reply: {}", e)))
    }
}
