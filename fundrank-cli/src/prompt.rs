//! Prompt building for pairwise comparisons.

use std::path::Path;

use crate::bail;

/// Placeholders a template must contain.
const REQUIRED_PLACEHOLDERS: [&str; 3] = ["$criterion", "$first", "$second"];

/// The default comparison prompt.
///
/// Asks the judge to analyze first and then emit a "Verdict:" marker followed
/// by a single letter, which `parse::parse_verdict` extracts.
pub const DEFAULT_TEMPLATE: &str = "\
$criterion

First application:
$first

Second application:
$second

Instructions:
Weigh the two applications against each other and write a short analysis. \
Then write \"Verdict:\" on its own line, followed by exactly one of these \
letters and its label:

A: the first application wins
B: the second application wins
C: too close to call
";

/// Fill a template's placeholders for one pair.
pub fn build_prompt(template: &str, criterion: &str, first: &str, second: &str) -> String {
    template
        .replace("$criterion", criterion)
        .replace("$first", first)
        .replace("$second", second)
}

/// Load a custom template from a file, verifying all placeholders exist.
pub fn load_template(path: &Path) -> String {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| bail(format!("Failed to read prompt template {}: {e}", path.display())));
    for placeholder in REQUIRED_PLACEHOLDERS {
        if !content.contains(placeholder) {
            bail(format!(
                "Prompt template {} is missing the {placeholder} placeholder",
                path.display()
            ));
        }
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template_has_placeholders() {
        for placeholder in REQUIRED_PLACEHOLDERS {
            assert!(DEFAULT_TEMPLATE.contains(placeholder), "missing {placeholder}");
        }
    }

    #[test]
    fn test_build_prompt_substitutes() {
        let prompt = build_prompt(
            DEFAULT_TEMPLATE,
            "Which project was more impactful?",
            "Storage tooling",
            "Retrieval gateway",
        );
        assert!(prompt.starts_with("Which project was more impactful?"));
        assert!(prompt.contains("First application:\nStorage tooling"));
        assert!(prompt.contains("Second application:\nRetrieval gateway"));
        assert!(prompt.contains("Verdict:"));
        assert!(!prompt.contains("$criterion"));
    }
}
