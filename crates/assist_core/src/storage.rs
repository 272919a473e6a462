use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::faq::{FaqEntry, FaqPair};
use crate::recommend::Profile;
use crate::smalltalk::{SmallTalkPair, SmallTalkTable};

/// Writes precomputed entries as one JSON object per line.
pub fn save_entries_jsonl(path: &Path, entries: &[FaqEntry]) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for entry in entries {
        let line = serde_json::to_string(entry).context("serialize faq entry")?;
        writer
            .write_all(line.as_bytes())
            .context("write entry line")?;
        writer.write_all(b"\n").context("write newline")?;
    }

    writer.flush().context("flush output")
}

pub fn load_entries_jsonl(path: &Path) -> Result<Vec<FaqEntry>> {
    read_jsonl(path, "faq entry")
}

/// Loads raw (question, answer) pairs, the input format of `build-index`.
pub fn load_pairs_jsonl(path: &Path) -> Result<Vec<FaqPair>> {
    read_jsonl(path, "faq pair")
}

fn read_jsonl<T: serde::de::DeserializeOwned>(path: &Path, what: &str) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut out = Vec::new();

    for line in reader.lines() {
        let line = line.context("read jsonl line")?;
        if line.trim().is_empty() {
            continue;
        }
        out.push(
            serde_json::from_str(&line).with_context(|| format!("parse {what} json"))?,
        );
    }

    Ok(out)
}

/// Loads a small-talk table from a JSON array of `{"trigger", "reply"}`
/// objects, validating order-preserving table semantics.
pub fn load_smalltalk_json(path: &Path) -> Result<SmallTalkTable> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let pairs: Vec<SmallTalkPair> =
        serde_json::from_reader(file).context("parse small-talk json")?;
    SmallTalkTable::new(pairs).context("validate small-talk table")
}

/// Loads a resolver config (threshold, fallback reply) from JSON; absent
/// fields keep their defaults.
pub fn load_config_json(path: &Path) -> Result<crate::resolver::ResolverConfig> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(file).context("parse resolver config json")
}

/// Loads recommender profiles from a JSON array.
pub fn load_profiles_json(path: &Path) -> Result<Vec<Profile>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(file).context("parse profiles json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(question: &str, answer: &str) -> FaqEntry {
        FaqEntry {
            question: question.to_string(),
            answer: answer.to_string(),
            embedding: vec![0.25, 0.5],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn entries_round_trip_through_jsonl() {
        let dir = std::env::temp_dir().join("assist_core_storage_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("entries.jsonl");

        let entries = vec![entry("q1", "a1"), entry("q2", "a2")];
        save_entries_jsonl(&path, &entries).unwrap();

        let loaded = load_entries_jsonl(&path).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].question, "q1");
        assert_eq!(loaded[1].answer, "a2");
        assert_eq!(loaded[0].embedding, vec![0.25, 0.5]);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn blank_lines_are_skipped() {
        let dir = std::env::temp_dir().join("assist_core_storage_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pairs.jsonl");
        std::fs::write(
            &path,
            "{\"question\":\"q\",\"answer\":\"a\"}\n\n{\"question\":\"q2\",\"answer\":\"a2\"}\n",
        )
        .unwrap();

        let pairs = load_pairs_jsonl(&path).unwrap();
        assert_eq!(pairs.len(), 2);

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn smalltalk_loader_rejects_unnormalized_triggers() {
        let dir = std::env::temp_dir().join("assist_core_storage_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("smalltalk.json");
        std::fs::write(&path, "[{\"trigger\":\"Hi!\",\"reply\":\"x\"}]").unwrap();

        assert!(load_smalltalk_json(&path).is_err());

        std::fs::remove_file(&path).unwrap();
    }
}
