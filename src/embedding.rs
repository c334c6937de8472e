use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use async_openai::{Client, config::OpenAIConfig, types::CreateEmbeddingRequestArgs};
use tokio::sync::OnceCell;
use tracing::debug;

/// Source of fixed-size text embeddings
pub trait Embedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Embeddings from an OpenAI-compatible endpoint.
///
/// The client is built on the first request and reused afterwards, so
/// constructing one for a strategy that never embeds costs nothing.
pub struct OpenAiEmbedder {
    config: EmbeddingConfig,
    client: OnceCell<Client<OpenAIConfig>>,
}

impl OpenAiEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config,
            client: OnceCell::new(),
        }
    }

    async fn client(&self) -> Result<&Client<OpenAIConfig>, EmbeddingError> {
        self.client
            .get_or_try_init(|| async { self.create_client() })
            .await
    }

    fn create_client(&self) -> Result<Client<OpenAIConfig>, EmbeddingError> {
        let mut openai_config = OpenAIConfig::new().with_api_base(&self.config.api_endpoint);

        if let Some(var) = &self.config.env_var_api_key {
            let api_key = std::env::var(var)
                .map_err(|_| EmbeddingError::MissingApiKey { var: var.clone() })?;
            openai_config = openai_config.with_api_key(api_key);
        }

        debug!(
            endpoint = %self.config.api_endpoint,
            model = %self.config.model,
            "initialized embedding client"
        );

        Ok(Client::with_config(openai_config))
    }
}

impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let client = self.client().await?;

        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.config.model)
            .input(text.to_string())
            .build()?;

        let response = client.embeddings().create(request).await?;

        response
            .data
            .into_iter()
            .next()
            .map(|embedding| embedding.embedding)
            .ok_or(EmbeddingError::EmptyResponse)
    }
}

/// Cosine similarity; 0.0 for empty, zero or mismatched vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f64 = a.iter().zip(b).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum();
    let norm_a: f64 = a.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}
