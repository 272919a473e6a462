use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::embed::EmbeddingProvider;
use crate::faq::{FaqEntry, FaqPair};
use crate::index::{similarity, SimilarityIndex};
use crate::smalltalk::SmallTalkTable;
use crate::spell::SpellCorrector;
use crate::text::normalize;

pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.4;
pub const DEFAULT_FALLBACK_REPLY: &str =
    "Sorry, I didn't get that 🤔. Can you rephrase your question?";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Minimum similarity for a FAQ match to be trusted; below it the
    /// resolver answers with `fallback_reply` instead.
    pub similarity_threshold: f32,
    pub fallback_reply: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

/// Which path produced a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    SmallTalk,
    Faq,
    Fallback,
}

/// A reply plus where it came from. `position` and `score` describe the
/// nearest FAQ entry; on the fallback path they still carry the rejected
/// candidate, which is what eval runs and logs want to see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub reply: String,
    pub outcome: Outcome,
    pub position: Option<usize>,
    pub score: Option<f32>,
}

/// The intent resolver: all state is built in one phase and read-only for
/// the life of the process, so `resolve` takes `&self` and is safe to call
/// from concurrent requests.
pub struct Resolver<E> {
    entries: Vec<FaqEntry>,
    smalltalk: SmallTalkTable,
    corrector: SpellCorrector,
    index: SimilarityIndex,
    embedder: E,
    config: ResolverConfig,
}

impl<E: EmbeddingProvider> Resolver<E> {
    /// Embeds every question with `embedder` and builds all derived state.
    pub fn build(
        pairs: Vec<FaqPair>,
        smalltalk: SmallTalkTable,
        embedder: E,
        config: ResolverConfig,
    ) -> Result<Self> {
        let now = Utc::now();
        let mut entries = Vec::with_capacity(pairs.len());
        for pair in pairs {
            let embedding = embedder
                .embed(&pair.question)
                .with_context(|| format!("embed FAQ question {:?}", pair.question))?;
            entries.push(FaqEntry {
                question: pair.question,
                answer: pair.answer,
                embedding,
                created_at: now,
            });
        }
        Self::from_entries(entries, smalltalk, embedder, config)
    }

    /// Builds from entries whose embeddings were precomputed, e.g. loaded
    /// from an index file. The embedder must be the same transform that
    /// produced those embeddings.
    pub fn from_entries(
        entries: Vec<FaqEntry>,
        smalltalk: SmallTalkTable,
        embedder: E,
        config: ResolverConfig,
    ) -> Result<Self> {
        let index = SimilarityIndex::build(entries.iter().map(|e| e.embedding.as_slice()))
            .context("build similarity index over FAQ embeddings")?;
        let corrector = SpellCorrector::from_corpus(
            entries
                .iter()
                .map(|e| e.question.as_str())
                .chain(smalltalk.pairs().iter().map(|p| p.trigger.as_str())),
        );

        Ok(Self {
            entries,
            smalltalk,
            corrector,
            index,
            embedder,
            config,
        })
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Maps one utterance to exactly one reply. Never fails on input shape;
    /// the only error path is a failing embedding/search collaborator, which
    /// is surfaced to the caller per request.
    pub fn resolve(&self, utterance: &str) -> Result<String> {
        self.resolve_detailed(utterance).map(|r| r.reply)
    }

    /// `resolve`, keeping the matched position and similarity score.
    pub fn resolve_detailed(&self, utterance: &str) -> Result<Resolution> {
        let cleaned = self.corrector.correct_text(&normalize(utterance));

        if let Some(reply) = self.smalltalk.reply_for(&cleaned) {
            return Ok(Resolution {
                reply: reply.to_string(),
                outcome: Outcome::SmallTalk,
                position: None,
                score: None,
            });
        }

        // Empty input deliberately flows through embedding and search like
        // any other string.
        let query = self
            .embedder
            .embed(&cleaned)
            .with_context(|| format!("embed utterance {cleaned:?}"))?;
        let neighbor = self
            .index
            .nearest(&query)
            .context("nearest-neighbor search")?;
        let score = similarity(neighbor.distance);

        if score < self.config.similarity_threshold {
            return Ok(Resolution {
                reply: self.config.fallback_reply.clone(),
                outcome: Outcome::Fallback,
                position: Some(neighbor.position),
                score: Some(score),
            });
        }

        Ok(Resolution {
            reply: self.entries[neighbor.position].answer.clone(),
            outcome: Outcome::Faq,
            position: Some(neighbor.position),
            score: Some(score),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::HashEmbeddingProvider;
    use crate::faq;

    fn resolver() -> Resolver<HashEmbeddingProvider> {
        Resolver::build(
            faq::builtin(),
            SmallTalkTable::builtin(),
            HashEmbeddingProvider::default(),
            ResolverConfig::default(),
        )
        .unwrap()
    }

    #[test]
    fn every_builtin_question_returns_its_own_answer() {
        let r = resolver();
        for (position, pair) in faq::builtin().into_iter().enumerate() {
            let res = r.resolve_detailed(&pair.question).unwrap();
            assert_eq!(res.outcome, Outcome::Faq, "question {position:?}");
            assert_eq!(res.position, Some(position));
            assert_eq!(res.reply, pair.answer);
            assert!(res.score.unwrap() > 0.999);
        }
    }

    #[test]
    fn upload_question_hits_first_entry() {
        let r = resolver();
        assert_eq!(
            r.resolve("How can I upload a project?").unwrap(),
            "Go to your profile and click 'Add Project' to upload project details."
        );
    }

    #[test]
    fn every_smalltalk_trigger_returns_its_reply() {
        let r = resolver();
        for pair in SmallTalkTable::builtin().pairs() {
            assert_eq!(r.resolve(&pair.trigger).unwrap(), pair.reply);
        }
    }

    #[test]
    fn smalltalk_prefix_beats_faq_lookup() {
        let r = resolver();
        let res = r.resolve_detailed("hi there").unwrap();
        assert_eq!(res.outcome, Outcome::SmallTalk);
        assert_eq!(
            res.reply,
            "Hello! 😊 What do you want to know about the website?"
        );
    }

    #[test]
    fn misspelled_greeting_is_corrected_into_smalltalk() {
        let r = resolver();
        let res = r.resolve_detailed("Hiii!!").unwrap();
        assert_eq!(res.outcome, Outcome::SmallTalk);
        assert_eq!(
            res.reply,
            "Hello! 😊 What do you want to know about the website?"
        );
    }

    #[test]
    fn gibberish_falls_back() {
        let r = resolver();
        let res = r.resolve_detailed("asdkjasldkj random text").unwrap();
        assert_eq!(res.outcome, Outcome::Fallback);
        assert_eq!(res.reply, DEFAULT_FALLBACK_REPLY);
        assert!(res.score.unwrap() < DEFAULT_SIMILARITY_THRESHOLD);
        // the rejected nearest candidate is still reported
        assert!(res.position.is_some());
    }

    #[test]
    fn empty_input_is_searched_not_rejected() {
        let r = resolver();
        // "" embeds to the zero vector, which sits at squared distance 1.0
        // from every unit-length question embedding: similarity 0.5 clears
        // the default gate, so some FAQ answer comes back rather than an
        // error or the fallback. Which entry wins the tie is not part of the
        // contract.
        let res = r.resolve_detailed("").unwrap();
        assert_eq!(res.outcome, Outcome::Faq);
        assert!((res.score.unwrap() - 0.5).abs() < 1e-3);

        let res = r.resolve_detailed("   !!! ").unwrap();
        assert_eq!(res.outcome, Outcome::Faq);
    }

    #[test]
    fn threshold_is_configurable() {
        let lenient = Resolver::build(
            faq::builtin(),
            SmallTalkTable::builtin(),
            HashEmbeddingProvider::default(),
            ResolverConfig {
                similarity_threshold: 0.0,
                ..ResolverConfig::default()
            },
        )
        .unwrap();
        // with a zero threshold even gibberish resolves to some FAQ answer
        let res = lenient
            .resolve_detailed("asdkjasldkj random text")
            .unwrap();
        assert_eq!(res.outcome, Outcome::Faq);

        let strict = Resolver::build(
            faq::builtin(),
            SmallTalkTable::builtin(),
            HashEmbeddingProvider::default(),
            ResolverConfig {
                similarity_threshold: 1.1,
                fallback_reply: "rephrase please".to_string(),
            },
        )
        .unwrap();
        assert_eq!(
            strict.resolve("How can I upload a project?").unwrap(),
            "rephrase please"
        );
    }

    /// An embedder whose backend is down: every call fails.
    struct UnavailableEmbedder;

    impl EmbeddingProvider for UnavailableEmbedder {
        fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            anyhow::bail!("embedding backend unavailable")
        }
    }

    #[test]
    fn embedding_failure_surfaces_as_error_not_reply() {
        // Precompute the entries so construction succeeds, then swap in an
        // embedder that fails at query time.
        let hash = HashEmbeddingProvider::default();
        let now = Utc::now();
        let entries: Vec<FaqEntry> = faq::builtin()
            .into_iter()
            .map(|pair| {
                let embedding = hash.embed(&pair.question).unwrap();
                FaqEntry {
                    question: pair.question,
                    answer: pair.answer,
                    embedding,
                    created_at: now,
                }
            })
            .collect();
        let r = Resolver::from_entries(
            entries,
            SmallTalkTable::builtin(),
            UnavailableEmbedder,
            ResolverConfig::default(),
        )
        .unwrap();

        // small talk never touches the embedder
        assert_eq!(
            r.resolve("hi").unwrap(),
            "Hello! 😊 What do you want to know about the website?"
        );

        let err = r.resolve("how do i upload a project").unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("embed utterance"), "chain: {chain}");
        assert!(chain.contains("embedding backend unavailable"), "chain: {chain}");
    }

    #[test]
    fn empty_knowledge_base_is_a_build_error() {
        let built = Resolver::build(
            Vec::new(),
            SmallTalkTable::builtin(),
            HashEmbeddingProvider::default(),
            ResolverConfig::default(),
        );
        assert!(built.is_err());
    }
}
