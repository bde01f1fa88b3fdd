//! Grounded answer generation

use std::sync::Arc;
use tracing::{debug, warn};

use pdfqa_core::{Answer, DecodingConfig, GenerationModel, RetrievedContext};

/// Phrase the model is told to emit when the context does not answer the question
pub const NO_INFORMATION_PHRASE: &str = "No relevant information found";

/// Answer returned when the generator is handed no contexts at all
pub const NO_CONTEXT_ANSWER: &str = "No relevant information found in PDFs.";

/// Builds the grounded prompt and turns model output into a cited answer
pub struct AnswerGenerator {
    model: Arc<dyn GenerationModel>,
    decoding: DecodingConfig,
    max_contexts: usize,
}

impl AnswerGenerator {
    pub fn new(model: Arc<dyn GenerationModel>, decoding: DecodingConfig) -> Self {
        Self {
            model,
            decoding,
            max_contexts: 5,
        }
    }

    pub fn with_max_contexts(mut self, max_contexts: usize) -> Self {
        self.max_contexts = max_contexts.max(1);
        self
    }

    /// Contexts that actually make it into the prompt
    fn included<'a>(&self, contexts: &'a [RetrievedContext]) -> &'a [RetrievedContext] {
        &contexts[..contexts.len().min(self.max_contexts)]
    }

    /// Render the instruction prompt for `query` over `contexts`
    pub fn build_prompt(&self, query: &str, contexts: &[RetrievedContext]) -> String {
        let combined = self
            .included(contexts)
            .iter()
            .map(|context| {
                format!(
                    "{} (Source: {}, Page {})",
                    context.chunk.text, context.chunk.file, context.chunk.page
                )
            })
            .collect::<Vec<_>>()
            .join(" ");

        format!(
            "You are a helpful assistant. Answer the question ONLY using the context. \
             If the answer is not in the context, say '{}'.\n\n\
             Context:\n{}\n\nQuestion: {}\nAnswer concisely:",
            NO_INFORMATION_PHRASE, combined, query
        )
    }

    /// Generate an answer with citations for the contexts placed in the prompt
    ///
    /// Never fails: model errors become the answer text so a chat turn always
    /// has something to show.
    pub async fn generate(&self, query: &str, contexts: &[RetrievedContext]) -> Answer {
        if contexts.is_empty() {
            return Answer {
                text: NO_CONTEXT_ANSWER.to_string(),
                citations: Vec::new(),
            };
        }

        let included = self.included(contexts);
        let prompt = self.build_prompt(query, included);
        debug!(
            model = self.model.model_id(),
            contexts = included.len(),
            prompt_chars = prompt.len(),
            "generating answer"
        );

        match self.model.generate(&prompt, &self.decoding).await {
            Ok(raw) => Answer {
                text: clean_answer(&raw),
                citations: included.iter().map(RetrievedContext::citation).collect(),
            },
            Err(e) => {
                warn!(model = self.model.model_id(), error = %e, "answer generation failed");
                Answer {
                    text: format!("Error generating answer: {}", e),
                    citations: Vec::new(),
                }
            }
        }
    }
}

/// Trim model output and drop an echoed `Answer:` label
fn clean_answer(raw: &str) -> String {
    let trimmed = raw.trim();
    let stripped = trimmed
        .strip_prefix("Answer:")
        .or_else(|| trimmed.strip_prefix("answer:"))
        .unwrap_or(trimmed);
    stripped.trim().to_string()
}
