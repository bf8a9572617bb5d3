//! Embedding collaborator: opaque `text -> vector`.
//!
//! Providers are selected per table through [`EmbeddingConfig`]. Failures
//! surface as `AppError::RetrievalUnavailable`.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, EmbeddingProvider};

use ragcheck_core::{AppError, AppResult};

/// Embed `texts` in batches of at most `batch_size`, checking that every
/// vector has the provider's dimensionality.
pub async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
    batch_size: usize,
) -> AppResult<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(
        "Embedding {} texts using provider '{}' (model: {})",
        texts.len(),
        provider.provider_name(),
        provider.model_name()
    );

    let mut vectors = Vec::with_capacity(texts.len());
    for batch in texts.chunks(batch_size.max(1)) {
        let embedded = provider.embed_batch(batch).await?;
        if embedded.len() != batch.len() {
            return Err(AppError::RetrievalUnavailable(format!(
                "Embedding provider returned {} vectors for {} texts",
                embedded.len(),
                batch.len()
            )));
        }
        vectors.extend(embedded);
    }

    if let Some(bad) = vectors.iter().find(|v| v.len() != provider.dimensions()) {
        return Err(AppError::RetrievalUnavailable(format!(
            "Embedding dimension mismatch: expected {}, got {}",
            provider.dimensions(),
            bad.len()
        )));
    }

    tracing::debug!(
        "Generated {} embeddings of dimension {}",
        vectors.len(),
        provider.dimensions()
    );

    Ok(vectors)
}

/// Scale a vector to unit length; zero vectors are left unchanged.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Cosine similarity between two vectors; 0.0 on length mismatch or zero norm.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
