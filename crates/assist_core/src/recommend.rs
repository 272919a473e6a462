use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::text::normalize;

/// A student profile flattened into a text document for TF-IDF scoring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub projects: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
}

impl Profile {
    pub fn document(&self) -> String {
        self.skills
            .iter()
            .chain(self.projects.iter())
            .chain(self.certifications.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub name: String,
    pub score: f32,
}

/// TF-IDF vectorizer with smoothed inverse document frequency
/// (`ln((1 + n) / (1 + df)) + 1`) and L2-normalized rows, so the dot product
/// of two vectors is their cosine similarity.
#[derive(Debug, Clone)]
pub struct TfidfModel {
    terms: HashMap<String, usize>,
    idf: Vec<f32>,
}

/// Tokens of at least two characters; single letters carry no signal in
/// skill lists.
fn tokenize(doc: &str) -> Vec<String> {
    normalize(doc)
        .split_whitespace()
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_string)
        .collect()
}

impl TfidfModel {
    pub fn fit(docs: &[String]) -> Self {
        let mut df: HashMap<String, usize> = HashMap::new();
        for doc in docs {
            let mut seen: Vec<String> = tokenize(doc);
            seen.sort_unstable();
            seen.dedup();
            for term in seen {
                *df.entry(term).or_insert(0) += 1;
            }
        }

        let mut vocab: Vec<&String> = df.keys().collect();
        vocab.sort_unstable();

        let n = docs.len() as f32;
        let mut terms = HashMap::with_capacity(vocab.len());
        let mut idf = Vec::with_capacity(vocab.len());
        for (i, term) in vocab.into_iter().enumerate() {
            idf.push(((1.0 + n) / (1.0 + df[term] as f32)).ln() + 1.0);
            terms.insert(term.clone(), i);
        }

        Self { terms, idf }
    }

    pub fn vocab_len(&self) -> usize {
        self.terms.len()
    }

    /// TF-IDF vector of a document over the fitted vocabulary; terms unseen
    /// during `fit` are ignored.
    pub fn vector(&self, doc: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.idf.len()];
        for token in tokenize(doc) {
            if let Some(&i) = self.terms.get(&token) {
                v[i] += self.idf[i];
            }
        }

        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Peers most similar to the given profile, best first, self excluded.
/// `None` when the id is unknown.
pub fn recommend(profiles: &[Profile], id: &str, top_n: usize) -> Option<Vec<Recommendation>> {
    let target = profiles.iter().position(|p| p.id == id)?;

    let docs: Vec<String> = profiles.iter().map(Profile::document).collect();
    let model = TfidfModel::fit(&docs);
    let vectors: Vec<Vec<f32>> = docs.iter().map(|d| model.vector(d)).collect();

    let mut scored: Vec<(usize, f32)> = (0..profiles.len())
        .filter(|&i| i != target)
        .map(|i| (i, dot(&vectors[target], &vectors[i])))
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    Some(
        scored
            .into_iter()
            .take(top_n)
            .map(|(i, score)| Recommendation {
                id: profiles[i].id.clone(),
                name: profiles[i].name.clone(),
                score,
            })
            .collect(),
    )
}

/// The demo cohort shipped with the recommender.
pub fn sample_profiles() -> Vec<Profile> {
    let raw: [(&str, &str, &[&str], &[&str], &[&str]); 4] = [
        (
            "u123",
            "Mohith",
            &["python", "machine learning", "ai"],
            &["chatbot", "recommendation system"],
            &["AWS", "TensorFlow"],
        ),
        (
            "u124",
            "Alice",
            &["python", "data science"],
            &["portfolio website"],
            &["Azure"],
        ),
        (
            "u125",
            "Bob",
            &["java", "spring boot"],
            &["ecommerce app"],
            &["Oracle"],
        ),
        (
            "u126",
            "Charlie",
            &["python", "ai"],
            &["chatbot"],
            &["AWS"],
        ),
    ];

    raw.into_iter()
        .map(|(id, name, skills, projects, certifications)| Profile {
            id: id.to_string(),
            name: name.to_string(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
            projects: projects.iter().map(|s| s.to_string()).collect(),
            certifications: certifications.iter().map(|s| s.to_string()).collect(),
        })
        .collect()
}
