use std::collections::{HashMap, HashSet};

use crate::text::normalize;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Frequency-dictionary spell corrector over the assistant's own vocabulary.
///
/// The dictionary is built from the FAQ questions and small-talk triggers, so
/// domain words ("github", "leetcode") are always known and never rewritten.
/// Correction is advisory: [`suggest`](Self::suggest) returns `None` whenever
/// no change should be made, and callers keep the original token.
#[derive(Debug, Clone, Default)]
pub struct SpellCorrector {
    counts: HashMap<String, u64>,
}

impl SpellCorrector {
    /// Builds the dictionary by normalizing and tokenizing every text in the
    /// corpus. Token frequency is used to rank correction candidates.
    pub fn from_corpus<'a, I>(corpus: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = HashMap::new();
        for text in corpus {
            for token in normalize(text).split_whitespace() {
                *counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    pub fn is_known(&self, token: &str) -> bool {
        self.counts.contains_key(token)
    }

    /// Best-effort correction for a single normalized token.
    ///
    /// Returns `None` when the token should stay as it is: it is already in
    /// the dictionary, it carries digits, or no candidate exists within edit
    /// distance 2. Candidates are ranked by dictionary frequency, with the
    /// lexicographically smaller word as the deterministic tie-break.
    pub fn suggest(&self, token: &str) -> Option<String> {
        if token.is_empty()
            || self.is_known(token)
            || token.chars().any(|c| c.is_ascii_digit())
        {
            return None;
        }

        let once = edits(token);
        if let Some(best) = self.best_known(once.iter()) {
            return Some(best);
        }

        let twice: HashSet<String> = once.iter().flat_map(|w| edits(w)).collect();
        self.best_known(twice.iter())
    }

    /// Corrects a whole normalized utterance token by token, keeping every
    /// token for which no correction is available.
    pub fn correct_text(&self, normalized: &str) -> String {
        normalized
            .split_whitespace()
            .map(|token| self.suggest(token).unwrap_or_else(|| token.to_string()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn best_known<'a, I>(&self, candidates: I) -> Option<String>
    where
        I: Iterator<Item = &'a String>,
    {
        candidates
            .filter_map(|c| self.counts.get(c.as_str()).map(|n| (c, *n)))
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map(|(c, _)| c.clone())
    }
}

/// All strings at edit distance 1: deletes, transposes, replaces, inserts.
fn edits(word: &str) -> Vec<String> {
    let chars: Vec<char> = word.chars().collect();
    let mut out = Vec::new();

    for i in 0..chars.len() {
        let mut deleted: String = chars[..i].iter().collect();
        deleted.extend(&chars[i + 1..]);
        out.push(deleted);
    }

    for i in 0..chars.len().saturating_sub(1) {
        let mut swapped = chars.clone();
        swapped.swap(i, i + 1);
        out.push(swapped.into_iter().collect());
    }

    for i in 0..chars.len() {
        for &b in ALPHABET {
            let mut replaced = chars.clone();
            replaced[i] = b as char;
            out.push(replaced.into_iter().collect());
        }
    }

    for i in 0..=chars.len() {
        for &b in ALPHABET {
            let mut inserted: String = chars[..i].iter().collect();
            inserted.push(b as char);
            inserted.extend(&chars[i..]);
            out.push(inserted);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corrector() -> SpellCorrector {
        SpellCorrector::from_corpus(["hi hello", "how do I upload a project", "project ranking"])
    }

    #[test]
    fn known_tokens_are_left_alone() {
        let c = corrector();
        assert_eq!(c.suggest("project"), None);
        assert_eq!(c.suggest("hi"), None);
    }

    #[test]
    fn corrects_within_one_edit() {
        let c = corrector();
        assert_eq!(c.suggest("projct").as_deref(), Some("project"));
        assert_eq!(c.suggest("uplaod").as_deref(), Some("upload"));
    }

    #[test]
    fn corrects_within_two_edits() {
        let c = corrector();
        assert_eq!(c.suggest("hiii").as_deref(), Some("hi"));
    }

    #[test]
    fn frequency_breaks_candidate_ties() {
        // "cat" and "car" are both one edit away; the more frequent wins.
        let c = SpellCorrector::from_corpus(["cat cat cat", "car"]);
        assert_eq!(c.suggest("cax").as_deref(), Some("cat"));
    }

    #[test]
    fn unknown_without_candidates_stays() {
        let c = corrector();
        assert_eq!(c.suggest("asdkjasldkj"), None);
    }

    #[test]
    fn digit_tokens_are_never_corrected() {
        let c = corrector();
        assert_eq!(c.suggest("pr0ject"), None);
    }

    #[test]
    fn correct_text_keeps_uncorrectable_tokens() {
        let c = corrector();
        assert_eq!(c.correct_text("uplaod a projct"), "upload a project");
        assert_eq!(c.correct_text("asdkjasldkj hello"), "asdkjasldkj hello");
        assert_eq!(c.correct_text(""), "");
    }
}
