use reqwest::Client;
use sentinel_core::error::{Result, SentinelError};
use sentinel_core::types::RetrievalMatch;
use serde_json::json;

/// Trait for nearest-neighbor retrieval backends.
pub trait Retriever: Send + Sync {
    /// Return the `top_k` best matches for `vector`, ordered by
    /// descending score as the backend scored them.
    fn query(
        &self,
        vector: &[f32],
        top_k: usize,
    ) -> impl std::future::Future<Output = Result<Vec<RetrievalMatch>>> + Send;
}

/// Client for a hosted nearest-neighbor vector index.
///
/// The provider returns matches ordered by descending score; this client
/// preserves that order and never re-sorts. Failures are terminal for the
/// request; retrieval is deliberately not retried.
pub struct VectorIndex {
    client: Client,
    base_url: String,
    api_key: String,
    namespace: String,
}

impl VectorIndex {
    pub fn new(client: Client, base_url: String, api_key: String, namespace: String) -> Self {
        Self {
            client,
            base_url,
            api_key,
            namespace,
        }
    }
}

impl Retriever for VectorIndex {
    /// Query the index for the `top_k` nearest neighbors of `vector`.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalMatch>> {
        let url = format!("{}/query", self.base_url.trim_end_matches('/'));

        let body = json!({
            "topK": top_k,
            "vector": vector,
            "namespace": self.namespace,
            "includeMetadata": true,
        });

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SentinelError::Retrieval(format!("request failed: {e}")))?;

        let status = response.status().as_u16();
        let response_text = response
            .text()
            .await
            .map_err(|e| SentinelError::Retrieval(format!("failed to read response body: {e}")))?;

        if !(200..300).contains(&status) {
            return Err(SentinelError::Http {
                status,
                body: response_text,
            });
        }

        let parsed: serde_json::Value = serde_json::from_str(&response_text)
            .map_err(|e| SentinelError::Retrieval(format!("failed to parse response JSON: {e}")))?;

        parse_matches(&parsed)
    }
}

/// Extract scored matches from a query response, keeping provider order.
/// Matches without both `text` and `url` metadata carry nothing the
/// prompt can use and are dropped here.
fn parse_matches(parsed: &serde_json::Value) -> Result<Vec<RetrievalMatch>> {
    let raw = parsed["matches"]
        .as_array()
        .ok_or_else(|| SentinelError::Retrieval("missing matches array in response".to_string()))?;

    let mut matches = Vec::with_capacity(raw.len());
    for item in raw {
        let score = match item["score"].as_f64() {
            Some(s) => s as f32,
            None => {
                return Err(SentinelError::Retrieval(
                    "missing score in match".to_string(),
                ))
            }
        };

        let text = item["metadata"]["text"].as_str();
        let url = item["metadata"]["url"].as_str();
        if let (Some(text), Some(url)) = (text, url) {
            matches.push(RetrievalMatch {
                score,
                text: text.to_string(),
                url: url.to_string(),
            });
        }
    }

    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_provider_order() {
        let response = serde_json::json!({
            "matches": [
                {"score": 0.92, "metadata": {"text": "first", "url": "https://docs/a"}},
                {"score": 0.81, "metadata": {"text": "second", "url": "https://docs/b"}},
            ]
        });

        let matches = parse_matches(&response).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text, "first");
        assert_eq!(matches[1].score, 0.81);
    }

    #[test]
    fn test_parse_drops_matches_without_metadata() {
        let response = serde_json::json!({
            "matches": [
                {"score": 0.9, "metadata": {"text": "usable", "url": "https://docs/a"}},
                {"score": 0.8, "metadata": {"text": "no url here"}},
                {"score": 0.7},
            ]
        });

        let matches = parse_matches(&response).unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].url, "https://docs/a");
    }

    #[test]
    fn test_parse_missing_matches_is_an_error() {
        let response = serde_json::json!({"results": []});
        assert!(parse_matches(&response).is_err());
    }
}
