use crate::models::Category;
use crate::rules::CategoryRule;

#[derive(Debug, Clone)]
struct CompiledRule {
    category: Category,
    tags: Vec<String>,
    names: Vec<String>,
}

/// First-match-wins evaluation of an ordered rule list.
///
/// Precedence is the order of the configured rules. Many models satisfy more
/// than one bucket, so reordering the table changes results.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CompiledRule>,
}

impl Categorizer {
    pub fn new(rules: &[CategoryRule]) -> Self {
        let lower = |values: &[String]| -> Vec<String> {
            values
                .iter()
                .map(|v| v.to_lowercase())
                .filter(|v| !v.is_empty())
                .collect()
        };
        Self {
            rules: rules
                .iter()
                .map(|rule| CompiledRule {
                    category: rule.category,
                    tags: lower(&rule.tags),
                    names: lower(&rule.names),
                })
                .collect(),
        }
    }

    pub fn categorize(&self, identifier: &str, tags: &[String]) -> Category {
        let tag_text = tags.join(" ").to_lowercase();
        let id = identifier.to_lowercase();
        self.rules
            .iter()
            .find(|rule| {
                rule.tags.iter().any(|t| tag_text.contains(t.as_str()))
                    || rule.names.iter().any(|n| id.contains(n.as_str()))
            })
            .map(|rule| rule.category)
            .unwrap_or(Category::Other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_category_rules;

    fn categorize(identifier: &str, tags: &[&str]) -> Category {
        let tags: Vec<String> = tags.iter().map(|t| t.to_string()).collect();
        Categorizer::new(&default_category_rules()).categorize(identifier, &tags)
    }

    #[test]
    fn multimodal_wins_over_llm() {
        assert_eq!(
            categorize("llava-hf/llava-v1.6-mistral-7b-hf", &["image-text-to-text", "text-generation"]),
            Category::Multimodal
        );
        assert_eq!(
            categorize("google/paligemma-3b", &["conversational"]),
            Category::Multimodal
        );
    }

    #[test]
    fn image_wins_over_everything() {
        assert_eq!(
            categorize("black-forest-labs/FLUX.1-dev", &["text-to-image", "multimodal"]),
            Category::Image
        );
    }

    #[test]
    fn audio_by_tag_or_name() {
        assert_eq!(categorize("openai/whisper-large-v3", &[]), Category::Audio);
        assert_eq!(categorize("org/model", &["text-to-speech"]), Category::Audio);
    }

    #[test]
    fn llm_by_name_fragment() {
        assert_eq!(categorize("Qwen/Qwen2.5-7B-Instruct", &[]), Category::Llm);
        assert_eq!(
            categorize("sentence-transformers/all-MiniLM-L6-v2", &["sentence-similarity"]),
            Category::Llm
        );
    }

    #[test]
    fn unmatched_is_other() {
        assert_eq!(categorize("someone/tabular-thing", &["tabular-regression"]), Category::Other);
    }

    #[test]
    fn empty_rule_table_yields_other() {
        let categorizer = Categorizer::new(&[]);
        assert_eq!(categorizer.categorize("meta-llama/Llama-3", &[]), Category::Other);
    }

    #[test]
    fn configured_order_is_respected() {
        let mut rules = default_category_rules();
        rules.reverse();
        let categorizer = Categorizer::new(&rules);
        let tags = vec!["image-text-to-text".to_string(), "text-generation".to_string()];
        assert_eq!(categorizer.categorize("llava-hf/llava", &tags), Category::Llm);
    }
}
