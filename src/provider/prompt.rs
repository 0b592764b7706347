// Copyright 2026 The Parapet Project
// SPDX-License-Identifier: Apache-2.0

// Prompt template shared by every provider.

/// Build the single user turn sent upstream.
///
/// The instruction order matters: search results first, general knowledge
/// only as a labelled fallback, and a hard sentence cap.
pub fn build_prompt(query: &str, context: &str, max_sentences: u32) -> String {
    let context = context.trim();
    let results = if context.is_empty() {
        "(no search results)"
    } else {
        context
    };

    format!(
        "Answer the USER QUERY using the SEARCH RESULTS below.\n\
         - Prefer the search results. Cite them by number like [1] when you use them.\n\
         - If the results do not cover the question, answer from general knowledge \
         and say that the results did not cover it.\n\
         - Keep the answer under {max_sentences} sentences. Plain text, no markdown headings.\n\
         \n\
         SEARCH RESULTS:\n\
         {results}\n\
         \n\
         USER QUERY: {query}",
        query = query.trim(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeds_query_and_context() {
        let prompt = build_prompt("why is the sky blue", "[1] Sky: Rayleigh scattering.", 4);
        assert!(prompt.contains("SEARCH RESULTS:\n[1] Sky: Rayleigh scattering.\n"));
        assert!(prompt.ends_with("USER QUERY: why is the sky blue"));
    }

    #[test]
    fn sentence_cap_is_configurable() {
        assert!(build_prompt("q", "c", 4).contains("under 4 sentences"));
        assert!(build_prompt("q", "c", 2).contains("under 2 sentences"));
    }

    #[test]
    fn results_take_precedence_over_general_knowledge() {
        let prompt = build_prompt("q", "c", 4);
        let prefer = prompt.find("Prefer the search results").unwrap();
        let fallback = prompt.find("general knowledge").unwrap();
        assert!(prefer < fallback);
    }

    #[test]
    fn empty_context_is_marked() {
        let prompt = build_prompt("q", "   ", 4);
        assert!(prompt.contains("SEARCH RESULTS:\n(no search results)\n"));
    }
}
