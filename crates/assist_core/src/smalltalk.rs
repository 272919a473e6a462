use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::text::normalize;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmallTalkPair {
    pub trigger: String,
    pub reply: String,
}

/// Ordered trigger → reply table checked before any semantic lookup.
///
/// Declaration order is the precedence rule: triggers may overlap as prefixes
/// ("how are you" vs "how r u"), and the first declared trigger that matches
/// wins. This is why the table is a sequence of pairs, never a map.
#[derive(Debug, Clone, Default)]
pub struct SmallTalkTable {
    pairs: Vec<SmallTalkPair>,
}

impl SmallTalkTable {
    /// Validates and stores the pairs. Triggers must be non-empty and already
    /// in normalized form. A trigger declared twice keeps its first position
    /// but takes the last declared reply.
    pub fn new(pairs: Vec<SmallTalkPair>) -> Result<Self> {
        let mut table: Vec<SmallTalkPair> = Vec::with_capacity(pairs.len());

        for pair in pairs {
            if pair.trigger.is_empty() {
                bail!("small-talk trigger must not be empty");
            }
            if pair.trigger != normalize(&pair.trigger) {
                bail!(
                    "small-talk trigger {:?} is not normalized (expected {:?})",
                    pair.trigger,
                    normalize(&pair.trigger)
                );
            }
            match table.iter_mut().find(|p| p.trigger == pair.trigger) {
                Some(existing) => existing.reply = pair.reply,
                None => table.push(pair),
            }
        }

        Ok(Self { pairs: table })
    }

    /// First declared trigger that is a prefix of the input wins; an exact
    /// match is just the full-length prefix case.
    pub fn reply_for(&self, normalized_input: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| normalized_input.starts_with(&p.trigger))
            .map(|p| p.reply.as_str())
    }

    pub fn pairs(&self) -> &[SmallTalkPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The platform's stock small-talk table.
    pub fn builtin() -> Self {
        let pairs = [
            ("hello", "Hi there! 👋 How can I help you today?"),
            ("hi", "Hello! 😊 What do you want to know about the website?"),
            ("hey", "Hey! Need help with something?"),
            ("thanks", "You're welcome! 🙌"),
            ("thank you", "Glad I could help! 👍"),
            ("bye", "Goodbye! 👋 Have a great day!"),
            ("goodbye", "See you later! 👋"),
            (
                "how are you",
                "I'm just a bot 🤖, but I'm doing great! How about you?",
            ),
            ("how r u", "I'm doing fine 🤖 thanks for asking!"),
            (
                "who are you",
                "I'm your website assistant bot! I can answer questions about using this platform.",
            ),
            (
                "what can you do",
                "I can help you with doubts about the website features, profiles, projects, and more.",
            ),
        ];

        // Stock triggers are distinct and already normalized, so no
        // validation pass is needed.
        Self {
            pairs: pairs
                .into_iter()
                .map(|(trigger, reply)| SmallTalkPair {
                    trigger: trigger.to_string(),
                    reply: reply.to_string(),
                })
                .collect(),
        }
    }
}
