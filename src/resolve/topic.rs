//! Topic matching for reference-by-description.
//!
//! Two phases, strictly ordered: phrase containment first, synonym/token
//! fallback only when no phrase match exists. Matching is substring and
//! synonym based only; there is no edit distance or embedding similarity,
//! which trades recall for predictability.

use uuid::Uuid;

use crate::config::SynonymGroups;
use crate::task::Task;

/// Case-insensitive containment in either direction: the task text contains
/// the topic, or the topic contains the task text.
pub fn phrase_match(task_text: &str, topic: &str) -> bool {
    let task_text = task_text.to_lowercase();
    let topic = topic.to_lowercase();
    if task_text.is_empty() || topic.is_empty() {
        return false;
    }
    task_text.contains(&topic) || topic.contains(&task_text)
}

fn topic_tokens(topic: &str) -> Vec<String> {
    topic
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| w.len() > 2)
        .collect()
}

/// Synonym words for the topic: every group whose key matches the topic, or
/// is contained in it, contributes its word list.
fn synonym_words(topic: &str, synonyms: &SynonymGroups) -> Vec<String> {
    let topic = topic.to_lowercase();
    let mut words = Vec::new();
    for (key, group) in synonyms {
        let key = key.to_lowercase();
        if topic == key || topic.contains(&key) || key.contains(&topic) {
            words.extend(group.iter().map(|w| w.to_lowercase()));
        }
    }
    words
}

/// Resolve a topic against `tasks`, preserving their order.
pub fn match_topic(tasks: &[Task], topic: &str, synonyms: &SynonymGroups) -> Vec<Uuid> {
    let topic = topic.trim();
    if topic.is_empty() {
        return Vec::new();
    }

    // Phase 1: phrase containment wins outright.
    let phrase: Vec<Uuid> = tasks
        .iter()
        .filter(|t| phrase_match(&t.text, topic))
        .map(|t| t.id)
        .collect();
    if !phrase.is_empty() {
        return phrase;
    }

    // Phase 2: synonym words and topic tokens as substrings.
    let words = synonym_words(topic, synonyms);
    let tokens = topic_tokens(topic);
    tasks
        .iter()
        .filter(|t| {
            let text = t.text.to_lowercase();
            words.iter().any(|w| text.contains(w.as_str()))
                || tokens.iter().any(|tok| text.contains(tok.as_str()))
        })
        .map(|t| t.id)
        .collect()
}
