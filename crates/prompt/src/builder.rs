//! Grounded prompt builder.
//!
//! Renders the fixed assistant template with numbered context blocks and the
//! user question. The output is deterministic: identical chunks and query
//! always produce the identical prompt string.

use handlebars::Handlebars;
use serde_json::json;

use safechat_core::{AppError, AppResult};
use safechat_kb::RetrievedChunk;

use crate::types::{Citation, GroundedPrompt};

/// The assistant prompt template.
///
/// The rule block is the contract the completion model is held to: factual
/// claims come only from the numbered context, out-of-context questions get
/// the fixed refusal sentence, and references use `[n]` citations.
const PROMPT_TEMPLATE: &str = "\
You are SafeChat, a grounded assistant for a curated knowledge base.

Use the provided knowledge base context to answer the user's question.
Rules:
- Answer only using the following context for factual claims.
- If the answer is not in the context, say: \"I don't have that in the provided knowledge base.\"
- Keep the answer concise and professional.
- If you reference context, cite it using [1], [2], etc.

KNOWLEDGE BASE CONTEXT:
{{context}}

USER QUESTION:
{{question}}
";

/// Build a grounded prompt from a query and retrieved chunks.
///
/// With no chunks the bare question is returned unchanged: there is nothing
/// to ground the answer in, and the guardrail still scans the raw text.
pub fn build_grounded_prompt(
    query: &str,
    chunks: &[RetrievedChunk],
) -> AppResult<GroundedPrompt> {
    if chunks.is_empty() {
        tracing::debug!("No context chunks; prompt is the bare question");
        return Ok(GroundedPrompt {
            text: query.to_string(),
            citations: Vec::new(),
        });
    }

    let mut citations = Vec::with_capacity(chunks.len());
    let mut blocks = Vec::with_capacity(chunks.len());

    for (i, retrieved) in chunks.iter().enumerate() {
        let index = i + 1;
        blocks.push(format!(
            "[{}] (source: {}, chunk: {})\n{}",
            index, retrieved.chunk.doc_id, retrieved.chunk.position, retrieved.chunk.text
        ));
        citations.push(Citation {
            index,
            doc_id: retrieved.chunk.doc_id.clone(),
            position: retrieved.chunk.position,
        });
    }

    let context = blocks.join("\n\n---\n\n");
    let text = render_template(&context, query)?;

    tracing::debug!(
        "Built grounded prompt: {} context blocks, {} chars",
        citations.len(),
        text.len()
    );

    Ok(GroundedPrompt { text, citations })
}

/// Render the prompt template with Handlebars.
fn render_template(context: &str, question: &str) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Plain text output; HTML escaping would mangle the context
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("grounded", PROMPT_TEMPLATE)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("grounded", &json!({ "context": context, "question": question }))
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use safechat_kb::DocumentChunk;

    fn retrieved(doc_id: &str, position: u32, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: DocumentChunk {
                id: DocumentChunk::make_id(doc_id, "hash", position),
                doc_id: doc_id.to_string(),
                position,
                text: text.to_string(),
                embedding: None,
            },
            score,
        }
    }

    #[test]
    fn test_prompt_embeds_instruction_and_context() {
        let chunks = vec![
            retrieved("roth.md", 0, "Roth IRAs use after-tax dollars.", 0.9),
            retrieved("401k.md", 2, "401k plans are employer sponsored.", 0.7),
        ];

        let prompt = build_grounded_prompt("Roth vs 401k?", &chunks).unwrap();

        assert!(prompt.text.contains("Answer only using the following context"));
        assert!(prompt.text.contains("[1] (source: roth.md, chunk: 0)"));
        assert!(prompt.text.contains("[2] (source: 401k.md, chunk: 2)"));
        assert!(prompt.text.contains("Roth IRAs use after-tax dollars."));
        assert!(prompt.text.contains("USER QUESTION:\nRoth vs 401k?"));
        assert!(prompt.text.contains("\n\n---\n\n"));
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let chunks = vec![retrieved("a.md", 0, "Some context.", 0.5)];

        let one = build_grounded_prompt("question?", &chunks).unwrap();
        let two = build_grounded_prompt("question?", &chunks).unwrap();

        assert_eq!(one.text, two.text);
    }

    #[test]
    fn test_prompt_without_chunks_is_bare_question() {
        let prompt = build_grounded_prompt("Just the question", &[]).unwrap();

        assert_eq!(prompt.text, "Just the question");
        assert!(prompt.citations.is_empty());
        assert!(!prompt.is_grounded());
    }

    #[test]
    fn test_citations_match_block_numbers() {
        let chunks = vec![
            retrieved("b.md", 1, "one", 0.9),
            retrieved("a.md", 0, "two", 0.8),
        ];

        let prompt = build_grounded_prompt("q", &chunks).unwrap();

        assert_eq!(prompt.citations.len(), 2);
        assert_eq!(prompt.citations[0].index, 1);
        assert_eq!(prompt.citations[0].doc_id, "b.md");
        assert_eq!(prompt.citations[1].index, 2);
        assert_eq!(prompt.citations[1].doc_id, "a.md");
    }

    #[test]
    fn test_context_is_not_html_escaped() {
        let chunks = vec![retrieved("a.md", 0, "limits are <b>strict</b> & firm", 0.9)];

        let prompt = build_grounded_prompt("q", &chunks).unwrap();
        assert!(prompt.text.contains("<b>strict</b> & firm"));
    }
}
