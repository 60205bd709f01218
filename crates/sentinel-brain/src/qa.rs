use std::time::Duration;

use sentinel_core::config::{CompletionConfig, QaConfig};
use sentinel_llm::provider::{EmbeddingProvider, LlmProvider};
use sentinel_llm::retry;
use sentinel_vector::index::Retriever;

use crate::answer;
use crate::assemble::{assemble, Assembly};

/// Terminal result of the network phase of a `.chat` invocation. The
/// caller maps each variant to exactly one user-visible reply.
#[derive(Debug, Clone)]
pub enum QaOutcome {
    Answer {
        text: String,
        contexts: usize,
        average_score: f32,
    },
    /// Nothing usable came back; reply with the canonical fallback.
    NoAnswer { highest_score: Option<f32> },
    /// The embedding step never produced a vector; reply with the
    /// generic failure notice.
    QueryFailed,
}

/// The retrieval-augmented answer pipeline:
/// embed → retrieve → assemble → generate.
///
/// Generic over its providers so they are injected once at startup and
/// replaceable in tests. Every failure is absorbed here; the pipeline
/// always lands on one of the three outcomes.
pub struct QaPipeline<E, V, L> {
    embedder: E,
    index: V,
    llm: L,
    qa: QaConfig,
    completion: CompletionConfig,
    top_k: usize,
}

impl<E, V, L> QaPipeline<E, V, L>
where
    E: EmbeddingProvider,
    V: Retriever,
    L: LlmProvider,
{
    pub fn new(
        embedder: E,
        index: V,
        llm: L,
        qa: QaConfig,
        completion: CompletionConfig,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            index,
            llm,
            qa,
            completion,
            top_k,
        }
    }

    /// The canonical "I'm not sure" sentence for this deployment.
    pub fn no_answer_line(&self) -> String {
        answer::no_answer_line(&self.qa.docs_url)
    }

    /// Run the network phase for an already-screened query.
    pub async fn run(&self, query: &str) -> QaOutcome {
        // Embeddings are cheap and flaky, so retry on a fixed cooldown.
        // Retrieval and generation failures below are terminal instead.
        let texts = [query];
        let embedded = retry::with_fixed_delay(
            self.qa.embed_retries,
            Duration::from_secs(self.qa.retry_delay_secs),
            || self.embedder.embed(&texts),
        )
        .await;

        let vector = match embedded {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => {
                log!(" [qa] embedding response had no usable vector");
                return QaOutcome::QueryFailed;
            }
            Err(e) => {
                log!(" [qa] embedding unavailable: {e}");
                return QaOutcome::QueryFailed;
            }
        };

        let matches = match self.index.query(&vector, self.top_k).await {
            Ok(m) => m,
            Err(e) => {
                log!(" [qa] retrieval failed: {e}");
                return QaOutcome::NoAnswer {
                    highest_score: None,
                };
            }
        };

        let context = match assemble(&matches, self.qa.min_score, self.qa.max_context_chars) {
            Assembly::Context(ctx) => ctx,
            Assembly::NoContext { highest_score } => {
                log!(
                    " [qa] no valid context found - highest score: {:?} - score needed: {}",
                    highest_score,
                    self.qa.min_score
                );
                return QaOutcome::NoAnswer { highest_score };
            }
        };

        let no_answer = self.no_answer_line();
        let response = match answer::generate(
            &self.llm,
            &self.completion,
            query,
            &context,
            &no_answer,
        )
        .await
        {
            Ok(r) => r,
            Err(e) => {
                log!(" [qa] generation failed: {e}");
                return QaOutcome::NoAnswer {
                    highest_score: None,
                };
            }
        };

        let rounded = (context.average_score * 1000.0).round() / 1000.0;
        match &response.usage {
            Some(u) => log!(
                " [qa] average confidence: {rounded} - contexts: {} - prompt tokens: {} - completion tokens: {}",
                context.blocks.len(),
                u.input_tokens,
                u.output_tokens
            ),
            None => log!(
                " [qa] average confidence: {rounded} - contexts: {}",
                context.blocks.len()
            ),
        }

        QaOutcome::Answer {
            text: response.content,
            contexts: context.blocks.len(),
            average_score: context.average_score,
        }
    }
}
