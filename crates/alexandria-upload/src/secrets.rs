use crate::{Error, Result};
use async_trait::async_trait;
use aws_sdk_secretsmanager::error::DisplayErrorContext;
use serde_json::Value;
use tracing::{debug, error};

/// Secret field holding the destination bucket.
pub const BUCKET_NAME_KEY: &str = "S3_BUCKET_NAME";

/// Where JSON secrets come from.
#[async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch secret `name` and parse its string value as JSON.
    async fn secret_json(&self, name: &str) -> Result<Value>;
}

/// AWS Secrets Manager.
pub struct SecretsManager {
    client: aws_sdk_secretsmanager::Client,
}

impl SecretsManager {
    pub fn new(client: aws_sdk_secretsmanager::Client) -> Self {
        Self { client }
    }

    /// Client for `region` using the default credential chain.
    pub async fn connect(region: &str) -> Self {
        let config = crate::aws::sdk_config(region).await;
        Self::new(aws_sdk_secretsmanager::Client::new(&config))
    }
}

#[async_trait]
impl SecretSource for SecretsManager {
    async fn secret_json(&self, name: &str) -> Result<Value> {
        debug!("Fetching secret {}", name);
        let output = self
            .client
            .get_secret_value()
            .secret_id(name)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!("Failed to retrieve secret '{}': {}", name, message);
                Error::SecretRetrieval {
                    name: name.to_string(),
                    message,
                }
            })?;

        let Some(text) = output.secret_string() else {
            return Err(Error::SecretRetrieval {
                name: name.to_string(),
                message: "secret has no string value".into(),
            });
        };
        serde_json::from_str(text).map_err(|e| Error::SecretRetrieval {
            name: name.to_string(),
            message: format!("secret is not valid JSON: {}", e),
        })
    }
}

/// The bucket named by `secret`'s `S3_BUCKET_NAME` field.
pub fn bucket_name(secret_name: &str, secret: &Value) -> Result<String> {
    match secret.get(BUCKET_NAME_KEY).and_then(Value::as_str) {
        Some(bucket) if !bucket.trim().is_empty() => Ok(bucket.to_string()),
        _ => Err(Error::SecretRetrieval {
            name: secret_name.to_string(),
            message: format!("missing {}", BUCKET_NAME_KEY),
        }),
    }
}
