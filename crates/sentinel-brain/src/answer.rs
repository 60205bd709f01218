use sentinel_core::config::CompletionConfig;
use sentinel_core::error::Result;
use sentinel_core::types::{ChatMessage, ChatRequest, ChatResponse};
use sentinel_llm::provider::LlmProvider;

use crate::assemble::AssembledContext;

/// The exact sentence the model must return when the context cannot
/// answer the question. Also sent directly on the no-context and
/// generation-failure paths so every "don't know" reads the same.
pub fn no_answer_line(docs_url: &str) -> String {
    format!(
        "I'm not sure, perhaps you can rephrase the question or find the answer in our documentation: <{docs_url}>"
    )
}

/// Build the instruction prompt: system preamble, one message per context
/// block (URL, score, content), then the question.
pub fn build_messages(
    question: &str,
    context: &AssembledContext,
    no_answer: &str,
) -> Vec<ChatMessage> {
    let system = String::new()
        + "You are the community documentation bot who answers a question based on the provided contexts and user question.\n"
        + "Instructions:\n"
        + "- Answer the question based on the context below and include all relevant information, consider the scores of the contexts when answering\n"
        + "- If the question can be answered, you should include the URL of the most used Context. Do not mention you got information from a Context.\n"
        + "- Any URL must be prepended with \"<\" and appended with \">\"\n"
        + &format!("- If the question can not be answered, you must answer with exactly \"{no_answer}\"\n");

    let mut messages = vec![ChatMessage::text("system", system)];

    for (i, block) in context.blocks.iter().enumerate() {
        messages.push(ChatMessage::text(
            "user",
            format!(
                "Context {}:\nURL: {}\nScore: {}\nContent: {}",
                i + 1,
                block.url,
                block.score,
                block.text
            ),
        ));
    }

    messages.push(ChatMessage::text("user", question));
    messages
}

/// Ask the completion provider for a grounded answer. Provider errors and
/// empty responses surface as `Generation`; this step is never retried.
pub async fn generate<L: LlmProvider>(
    llm: &L,
    config: &CompletionConfig,
    question: &str,
    context: &AssembledContext,
    no_answer: &str,
) -> Result<ChatResponse> {
    let request = ChatRequest {
        messages: build_messages(question, context, no_answer),
        max_tokens: Some(config.max_tokens),
        temperature: Some(config.temperature),
    };

    llm.chat(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinel_core::types::RetrievalMatch;

    fn context() -> AssembledContext {
        AssembledContext {
            blocks: vec![
                RetrievalMatch {
                    score: 0.9,
                    text: "The autopilot engages above 100ft.".to_string(),
                    url: "https://docs/autopilot".to_string(),
                },
                RetrievalMatch {
                    score: 0.8,
                    text: "Use the FCU to set the target altitude.".to_string(),
                    url: "https://docs/fcu".to_string(),
                },
            ],
            total_chars: 73,
            average_score: 0.85,
        }
    }

    #[test]
    fn test_fallback_sentence_is_verbatim() {
        assert_eq!(
            no_answer_line("https://docs.example.org"),
            "I'm not sure, perhaps you can rephrase the question or find the answer in our documentation: <https://docs.example.org>"
        );
    }

    #[test]
    fn test_messages_enumerate_context_blocks() {
        let no_answer = no_answer_line("https://docs");
        let messages = build_messages("how does autopilot work?", &context(), &no_answer);

        // system + two contexts + question
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, "system");
        assert!(messages[1].content.starts_with("Context 1:\nURL: https://docs/autopilot"));
        assert!(messages[2].content.starts_with("Context 2:\nURL: https://docs/fcu"));
        assert_eq!(messages[3].content, "how does autopilot work?");
    }

    #[test]
    fn test_system_prompt_pins_the_fallback_sentence() {
        let no_answer = no_answer_line("https://docs");
        let messages = build_messages("q?", &context(), &no_answer);
        assert!(messages[0].content.contains(&no_answer));
        assert!(messages[0].content.contains("prepended with \"<\""));
    }
}
