//! The versioned rule table that drives every tunable decision in a cycle:
//! which queries to run, what to block, how many entities one organization may
//! contribute, how trends are classified and how models are categorized.
//!
//! The table is plain data. It ships with built-in defaults and can be
//! replaced wholesale by a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, StorageError};
use crate::models::{Category, SourceKind};

pub const RULE_TABLE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleTable {
    #[serde(default = "default_version")]
    pub version: u32,
    pub repositories: SourceRules,
    pub models: SourceRules,
    pub keywords: SourceRules,
    /// Evaluated in order; the first matching rule wins.
    #[serde(default = "default_category_rules")]
    pub categories: Vec<CategoryRule>,
}

fn default_version() -> u32 {
    RULE_TABLE_VERSION
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRules {
    pub queries: Vec<QueryDescriptor>,
    #[serde(default)]
    pub blocklist: Vec<String>,
    /// Entities whose metric is zero, absent or below `min_metric` are dropped.
    #[serde(default = "default_true")]
    pub drop_inactive: bool,
    #[serde(default)]
    pub min_metric: u64,
    #[serde(default)]
    pub org_cap: Option<usize>,
    /// Maximum survivors per bucket after filtering and capping.
    #[serde(default)]
    pub top_n: Option<usize>,
    pub trend: TrendPolicy,
    /// Delay between sequential provider calls, in milliseconds.
    #[serde(default)]
    pub pacing_ms: u64,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum QueryDescriptor {
    RepositorySearch {
        label: String,
        query: String,
        #[serde(default = "default_repo_sort")]
        sort: String,
        #[serde(default = "default_order")]
        order: String,
        #[serde(default = "default_per_page")]
        per_page: u8,
    },
    ModelTask {
        label: String,
        task: String,
        #[serde(default = "default_model_sort")]
        sort: String,
        #[serde(default = "default_model_limit")]
        limit: u32,
    },
    Keywords {
        label: String,
        terms: Vec<KeywordTerm>,
        #[serde(default = "default_window_days")]
        window_days: u32,
    },
}

impl QueryDescriptor {
    pub fn label(&self) -> &str {
        match self {
            QueryDescriptor::RepositorySearch { label, .. }
            | QueryDescriptor::ModelTask { label, .. }
            | QueryDescriptor::Keywords { label, .. } => label,
        }
    }

    fn source(&self) -> SourceKind {
        match self {
            QueryDescriptor::RepositorySearch { .. } => SourceKind::Repositories,
            QueryDescriptor::ModelTask { .. } => SourceKind::Models,
            QueryDescriptor::Keywords { .. } => SourceKind::Keywords,
        }
    }
}

fn default_repo_sort() -> String {
    "stars".to_string()
}

fn default_order() -> String {
    "desc".to_string()
}

fn default_per_page() -> u8 {
    20
}

fn default_model_sort() -> String {
    "downloads".to_string()
}

fn default_model_limit() -> u32 {
    40
}

fn default_window_days() -> u32 {
    30
}

/// A display keyword and the canonical topic title it is looked up under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordTerm {
    pub keyword: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum TrendPolicy {
    Threshold {
        rising_above: i64,
        falling_below: i64,
        #[serde(default)]
        basis: ThresholdBasis,
    },
    Percentile {
        falling_fraction: f64,
        rising_from: f64,
    },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdBasis {
    #[default]
    ChangePct,
    /// Absolute metric difference against the previous snapshot.
    Delta,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRule {
    pub category: Category,
    /// Fragments matched against the joined, lower-cased tag text.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Fragments matched against the lower-cased identifier.
    #[serde(default)]
    pub names: Vec<String>,
}

impl RuleTable {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let table: RuleTable = serde_json::from_str(raw)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let table = Self::from_json_str(&raw)?;
        log::info!(
            "Loaded rule table v{} from {}",
            table.version,
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Loads the file when given, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_json_file(path),
            None => Ok(Self::default()),
        }
    }

    pub fn for_source(&self, kind: SourceKind) -> &SourceRules {
        match kind {
            SourceKind::Repositories => &self.repositories,
            SourceKind::Models => &self.models,
            SourceKind::Keywords => &self.keywords,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for kind in SourceKind::ALL {
            let rules = self.for_source(kind);
            if rules.queries.is_empty() {
                return Err(config_error(kind, "at least one query is required"));
            }
            if let Some(query) = rules.queries.iter().find(|q| q.source() != kind) {
                return Err(config_error(
                    kind,
                    &format!("query '{}' belongs to another source", query.label()),
                ));
            }
            if rules.org_cap == Some(0) {
                return Err(config_error(kind, "org_cap must be at least 1"));
            }
            if rules.top_n == Some(0) {
                return Err(config_error(kind, "top_n must be at least 1"));
            }
            match &rules.trend {
                TrendPolicy::Threshold {
                    rising_above,
                    falling_below,
                    ..
                } if falling_below > rising_above => {
                    return Err(config_error(
                        kind,
                        "falling_below must not exceed rising_above",
                    ));
                }
                TrendPolicy::Percentile {
                    falling_fraction,
                    rising_from,
                } => {
                    let in_range = |v: f64| (0.0..=1.0).contains(&v);
                    if !in_range(*falling_fraction) || !in_range(*rising_from) {
                        return Err(config_error(kind, "percentile cutoffs must be within 0..=1"));
                    }
                    if falling_fraction > rising_from {
                        return Err(config_error(
                            kind,
                            "falling_fraction must not exceed rising_from",
                        ));
                    }
                }
                _ => {}
            }
        }
        if self.categories.is_empty() {
            return Err(StorageError::Config(
                "categories must list at least one rule".to_string(),
            ));
        }
        Ok(())
    }
}

fn config_error(kind: SourceKind, message: &str) -> StorageError {
    StorageError::Config(format!("{kind}: {message}"))
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for RuleTable {
    fn default() -> Self {
        Self {
            version: RULE_TABLE_VERSION,
            repositories: SourceRules {
                queries: vec![QueryDescriptor::RepositorySearch {
                    label: "ai-ml".to_string(),
                    query: "topic:machine-learning topic:artificial-intelligence".to_string(),
                    sort: default_repo_sort(),
                    order: default_order(),
                    per_page: 30,
                }],
                blocklist: strings(&["awesome-", "interview", "tutorial"]),
                drop_inactive: true,
                min_metric: 0,
                org_cap: Some(3),
                top_n: Some(20),
                trend: TrendPolicy::Threshold {
                    rising_above: 50,
                    falling_below: -20,
                    basis: ThresholdBasis::Delta,
                },
                pacing_ms: 0,
            },
            models: SourceRules {
                queries: ["text-generation", "text-to-image", "automatic-speech-recognition", "image-text-to-text"]
                    .iter()
                    .map(|task| QueryDescriptor::ModelTask {
                        label: task.to_string(),
                        task: task.to_string(),
                        sort: default_model_sort(),
                        limit: default_model_limit(),
                    })
                    .collect(),
                blocklist: strings(&[
                    "hf-internal-testing",
                    "trl-internal-testing",
                    "peft-internal-testing",
                    "tiny-random",
                    "dummy",
                    "test-model",
                    "openai-community/gpt2",
                ]),
                drop_inactive: true,
                min_metric: 0,
                org_cap: Some(3),
                top_n: Some(5),
                trend: TrendPolicy::Threshold {
                    rising_above: 5,
                    falling_below: -5,
                    basis: ThresholdBasis::ChangePct,
                },
                pacing_ms: 0,
            },
            keywords: SourceRules {
                queries: vec![QueryDescriptor::Keywords {
                    label: "wikipedia".to_string(),
                    terms: default_keyword_terms(),
                    window_days: default_window_days(),
                }],
                blocklist: Vec::new(),
                drop_inactive: false,
                min_metric: 0,
                org_cap: None,
                top_n: None,
                trend: TrendPolicy::Percentile {
                    falling_fraction: 0.25,
                    rising_from: 0.60,
                },
                pacing_ms: 200,
            },
            categories: default_category_rules(),
        }
    }
}

fn default_keyword_terms() -> Vec<KeywordTerm> {
    [
        ("ChatGPT", "ChatGPT"),
        ("Claude", "Claude_(language_model)"),
        ("Google Gemini", "Google_Gemini"),
        ("Grok", "Grok_(chatbot)"),
        ("Perplexity", "Perplexity_AI"),
        ("DeepSeek", "DeepSeek"),
        ("NotebookLM", "NotebookLM"),
        ("Mistral AI", "Mistral_AI"),
        ("Llama", "Llama_(language_model)"),
        ("Midjourney", "Midjourney"),
        ("Stable Diffusion", "Stable_Diffusion"),
        ("Sora", "Sora_(text-to-video_model)"),
        ("Qwen", "Qwen"),
        ("GPT-4o", "GPT-4o"),
        ("DALL-E", "DALL-E"),
        ("GitHub Copilot", "GitHub_Copilot"),
        ("AI Agent", "Intelligent_agent"),
        ("Whisper", "Whisper_(speech_recognition_system)"),
        ("GPT-4", "GPT-4"),
        ("GPT-3", "GPT-3"),
    ]
    .iter()
    .map(|(keyword, title)| KeywordTerm {
        keyword: keyword.to_string(),
        title: title.to_string(),
    })
    .collect()
}

pub fn default_category_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule {
            category: Category::Image,
            tags: strings(&[
                "text-to-image",
                "image-generation",
                "image-classification",
                "image-segmentation",
                "object-detection",
                "depth-estimation",
            ]),
            names: strings(&["stable-diffusion", "sdxl", "dall-e", "flux", "controlnet"]),
        },
        CategoryRule {
            category: Category::Audio,
            tags: strings(&[
                "automatic-speech-recognition",
                "text-to-speech",
                "audio-classification",
                "voice-activity",
                "speech",
                "audio",
            ]),
            names: strings(&["whisper", "wav2vec", "clap", "hubert", "encodec"]),
        },
        CategoryRule {
            category: Category::Multimodal,
            tags: strings(&[
                "multimodal",
                "image-text-to-text",
                "visual-question-answering",
                "image-to-text",
                "video-classification",
            ]),
            names: strings(&["llava", "blip", "flamingo", "idefics", "paligemma", "clip"]),
        },
        CategoryRule {
            category: Category::Llm,
            tags: strings(&[
                "text-generation",
                "conversational",
                "feature-extraction",
                "fill-mask",
                "text-classification",
                "token-classification",
                "sentence-similarity",
                "question-answering",
                "translation",
                "summarization",
                "zero-shot-classification",
                "natural-language",
            ]),
            names: strings(&[
                "bert", "gpt", "llama", "mistral", "gemma", "falcon",
                "sentence-transformer", "roberta", "electra", "deberta", "xlnet", "bart",
                "albert", "distilbert", "minilm", "mpnet", "-t5", "phi-", "qwen",
                "deepseek", "mixtral", "command",
            ]),
        },
    ]
}
