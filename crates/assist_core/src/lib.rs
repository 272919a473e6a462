pub mod embed;
pub mod eval;
pub mod faq;
pub mod index;
pub mod minilm;
pub mod recommend;
pub mod resolver;
pub mod smalltalk;
pub mod spell;
pub mod storage;
pub mod text;

pub use embed::{EmbeddingProvider, HashEmbeddingProvider, DEFAULT_EMBEDDING_DIM};
pub use eval::{evaluate_cases, EvalCase, EvalOutcome, EvalSummary, DEFAULT_REQUIRED_PASS_RATE};
pub use faq::{FaqEntry, FaqPair};
pub use index::{similarity, IndexError, Neighbor, SimilarityIndex};
pub use minilm::MiniLmEmbeddingProvider;
pub use recommend::{recommend, sample_profiles, Profile, Recommendation, TfidfModel};
pub use resolver::{
    Outcome, Resolution, Resolver, ResolverConfig, DEFAULT_FALLBACK_REPLY,
    DEFAULT_SIMILARITY_THRESHOLD,
};
pub use smalltalk::{SmallTalkPair, SmallTalkTable};
pub use spell::SpellCorrector;
pub use storage::{
    load_config_json, load_entries_jsonl, load_pairs_jsonl, load_profiles_json,
    load_smalltalk_json, save_entries_jsonl,
};
pub use text::normalize;
