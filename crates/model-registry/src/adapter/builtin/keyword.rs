//! Keyword adapter: a rule-engine classifier.
//!
//! The model artifact is a JSON lexicon (a file, or a directory holding
//! `lexicon.json`):
//!
//! ```json
//! { "labels": { "positive": ["good", "great"], "negative": ["bad", "awful"] } }
//! ```
//!
//! Each label scores the share of input words found in its term list; the best
//! label wins unless its score does not exceed `min_score`, in which case
//! `default_label` is returned.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::adapter::contract::*;
use crate::errors::{InferenceError, SetupError};

const LEXICON_FILE: &str = "lexicon.json";

#[derive(Debug, Deserialize)]
struct KeywordOptions {
    #[serde(default = "default_label")]
    default_label: String,
    #[serde(default)]
    min_score: f64,
}

fn default_label() -> String {
    "neutral".to_string()
}

#[derive(Debug, Deserialize)]
struct LexiconFile {
    labels: BTreeMap<String, Vec<String>>,
}

struct Lexicon {
    labels: BTreeMap<String, HashSet<String>>,
}

impl Lexicon {
    fn load(model_path: &Path) -> Result<Self, SetupError> {
        let file: PathBuf = if model_path.is_dir() {
            model_path.join(LEXICON_FILE)
        } else {
            model_path.to_path_buf()
        };
        if !file.exists() {
            return Err(SetupError::ArtifactMissing(file));
        }

        let raw = std::fs::read_to_string(&file)
            .map_err(|e| SetupError::Backend(format!("failed to read {}: {}", file.display(), e)))?;
        let parsed: LexiconFile = serde_json::from_str(&raw)
            .map_err(|e| SetupError::Backend(format!("invalid lexicon {}: {}", file.display(), e)))?;
        if parsed.labels.is_empty() {
            return Err(SetupError::Backend(format!(
                "lexicon {} defines no labels",
                file.display()
            )));
        }

        let labels = parsed
            .labels
            .into_iter()
            .map(|(label, terms)| {
                let terms = terms.iter().map(|t| t.trim().to_lowercase()).collect();
                (label, terms)
            })
            .collect();
        Ok(Self { labels })
    }
}

fn words(input: &str) -> Vec<String> {
    input
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[derive(Default)]
pub struct KeywordAdapter {
    state: Option<(Lexicon, KeywordOptions)>,
}

impl KeywordAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ModelAdapter for KeywordAdapter {
    async fn setup(
        &mut self,
        model_path: &Path,
        params: &AdapterParams,
        _device: &Device,
    ) -> Result<(), SetupError> {
        if self.state.is_some() {
            return Err(SetupError::AlreadyInitialized);
        }
        let options: KeywordOptions = params.parse()?;
        let lexicon = Lexicon::load(model_path)?;
        info!(
            "keyword adapter loaded {} labels from {}",
            lexicon.labels.len(),
            model_path.display()
        );
        self.state = Some((lexicon, options));
        Ok(())
    }

    async fn inference(&self, input: &str) -> Result<InferenceOutput, InferenceError> {
        let (lexicon, options) = self.state.as_ref().ok_or(InferenceError::NotReady)?;

        let tokens = words(input);
        if tokens.is_empty() {
            return Err(InferenceError::InvalidInput(
                "input contains no words".to_string(),
            ));
        }

        let mut scores = serde_json::Map::new();
        let mut matched: Vec<&str> = Vec::new();
        let mut best: Option<(&str, f64)> = None;

        for (label, terms) in &lexicon.labels {
            let hits = tokens.iter().filter(|t| terms.contains(t.as_str())).count();
            for t in tokens.iter().filter(|t| terms.contains(t.as_str())) {
                if !matched.contains(&t.as_str()) {
                    matched.push(t.as_str());
                }
            }
            let score = hits as f64 / tokens.len() as f64;
            scores.insert(label.clone(), json!(score));
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((label.as_str(), score));
            }
        }

        let (label, score) = match best {
            Some((label, score)) if score > options.min_score => (label, score),
            Some((_, score)) => (options.default_label.as_str(), score),
            None => (options.default_label.as_str(), 0.0),
        };

        let mut out = InferenceOutput::new();
        out.insert("label".to_string(), json!(label));
        out.insert("score".to_string(), json!(score));
        out.insert("scores".to_string(), serde_json::Value::Object(scores));
        out.insert("matched".to_string(), json!(matched));
        Ok(out)
    }

    fn metadata(&self) -> AdapterMetadata {
        AdapterMetadata {
            adapter: "keyword".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            reentrant: true,
        }
    }
}
