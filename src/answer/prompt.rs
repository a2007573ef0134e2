//! Prompt template with `{context}` and `{question}` slots.

use crate::rag::ChunkSearchResult;

pub const DEFAULT_MEDICAL_TEMPLATE: &str = "Use the following pieces of information to answer the user's question.\n\
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
\n\
Context: {context}\n\
Question: {question}\n\
\n\
Only return the helpful answer below and nothing else.\n\
Helpful answer:";

const CONTEXT_SLOT: &str = "{context}";
const QUESTION_SLOT: &str = "{question}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    template: String,
}

impl PromptTemplate {
    /// Fails when either slot is missing from `template`.
    pub fn new(template: impl Into<String>) -> Result<Self, String> {
        let template = template.into();
        for slot in [CONTEXT_SLOT, QUESTION_SLOT] {
            if !template.contains(slot) {
                return Err(format!("prompt template is missing the {} slot", slot));
            }
        }
        Ok(Self { template })
    }

    /// Fills both slots in one pass so slot-like text inside the context is left alone.
    pub fn render(&self, context: &str, question: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + context.len() + question.len());
        let mut rest = self.template.as_str();
        while let Some(pos) = rest.find('{') {
            out.push_str(&rest[..pos]);
            let tail = &rest[pos..];
            if tail.starts_with(CONTEXT_SLOT) {
                out.push_str(context);
                rest = &tail[CONTEXT_SLOT.len()..];
            } else if tail.starts_with(QUESTION_SLOT) {
                out.push_str(question);
                rest = &tail[QUESTION_SLOT.len()..];
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self {
            template: DEFAULT_MEDICAL_TEMPLATE.to_string(),
        }
    }
}

/// Joins retrieved chunk texts in rank order, blank-line separated.
pub fn build_context(chunks: &[ChunkSearchResult]) -> String {
    chunks
        .iter()
        .map(|r| r.chunk.content.trim())
        .filter(|text| !text.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::StoredChunk;

    fn result(content: &str, score: f32) -> ChunkSearchResult {
        ChunkSearchResult {
            chunk: StoredChunk {
                chunk_id: format!("id-{}", content.len()),
                content: content.to_string(),
                source: "data/a.pdf".to_string(),
                chunk_index: 0,
                start_offset: 0,
            },
            score,
        }
    }

    #[test]
    fn default_template_fills_both_slots() {
        let prompt = PromptTemplate::default().render("Aspirin reduces fever.", "What reduces fever?");
        assert!(prompt.contains("Context: Aspirin reduces fever.\n"));
        assert!(prompt.contains("Question: What reduces fever?\n"));
        assert!(prompt.ends_with("Helpful answer:"));
        assert!(!prompt.contains("{context}"));
    }

    #[test]
    fn slot_text_inside_context_is_not_expanded() {
        let template = PromptTemplate::new("C={context} Q={question}").unwrap();
        let prompt = template.render("literal {question} here", "why?");
        assert_eq!(prompt, "C=literal {question} here Q=why?");
    }

    #[test]
    fn stray_braces_survive() {
        let template = PromptTemplate::new("{x} {context}|{question}}").unwrap();
        assert_eq!(template.render("a", "b"), "{x} a|b}");
    }

    #[test]
    fn template_without_slots_is_rejected() {
        assert!(PromptTemplate::new("no slots").is_err());
        assert!(PromptTemplate::new("{context} only").is_err());
    }

    #[test]
    fn context_joins_in_rank_order() {
        let chunks = vec![result("first", 0.9), result("  ", 0.5), result("second", 0.4)];
        assert_eq!(build_context(&chunks), "first\n\nsecond");
        assert_eq!(build_context(&[]), "");
    }
}
