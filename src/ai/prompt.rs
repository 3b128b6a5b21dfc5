//! Prompt construction for FAQ-grounded answers.

/// Literal reply the model is told to give when the context has no answer.
pub const GIVE_UP_REPLY: &str = "I don't know";

/// Phrases that mark an answer as a non-answer.
const GIVE_UP_SIGNALS: [&str; 2] = ["don't know", "cannot find"];

/// Formats one FAQ as a context line.
pub fn context_line(question: &str, answer: &str) -> String {
    format!("Q: {question} A: {answer}")
}

pub fn build_prompt(query: &str, context: &str) -> String {
    format!(
        "You are the support assistant of an insurance company.\n\
         Answer the customer's question using ONLY the FAQ entries below.\n\
         If the entries do not contain the answer, reply exactly \"{GIVE_UP_REPLY}\" and nothing else.\n\
         Keep the answer short and do not invent policy terms, amounts or dates.\n\n\
         FAQ entries:\n{context}\n\n\
         Customer question: {query}\n\
         Answer:"
    )
}

/// True when the model declined to answer. Case-insensitive, and typographic
/// apostrophes count as plain ones.
pub fn is_give_up(answer: &str) -> bool {
    let normalized = answer.to_lowercase().replace(['\u{2019}', '\u{2018}'], "'");
    GIVE_UP_SIGNALS
        .iter()
        .any(|signal| normalized.contains(signal))
}
