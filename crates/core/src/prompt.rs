//! The fixed instruction templates sent to the model.

const PLACEHOLDER: &str = "{{ARTICLE}}";

/// One of the two instruction templates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Template {
    /// Asks for a `SUMMARY:` line followed by `STARTER <n>:` lines.
    Analysis,
    /// Asks for an optional `THINK:` block followed by one `RESPONSE:`.
    Conversation,
}

impl Template {
    /// Returns the raw template text, placeholder included.
    #[inline]
    pub fn text(self) -> &'static str {
        match self {
            Template::Analysis => include_str!("../prompts/analysis.md"),
            Template::Conversation => {
                include_str!("../prompts/conversation.md")
            }
        }
    }

    /// Substitutes the article for the placeholder.
    ///
    /// Only the first occurrence in the template is replaced. The article
    /// itself is inserted verbatim, so placeholder text inside the article
    /// stays as it is.
    #[inline]
    pub fn render(self, article: &str) -> String {
        self.text().replacen(PLACEHOLDER, article, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_placeholder() {
        for template in [Template::Analysis, Template::Conversation] {
            assert_eq!(template.text().matches(PLACEHOLDER).count(), 1);
        }
    }

    #[test]
    fn test_render() {
        let prompt = Template::Analysis.render("Bees build hives.");
        assert!(prompt.contains("---\nBees build hives.\n---"));
        assert!(!prompt.contains(PLACEHOLDER));
        assert!(prompt.contains("STARTER 1:"));

        let prompt = Template::Conversation.render("Bees build hives.");
        assert!(prompt.contains("Bees build hives."));
        assert!(prompt.contains("RESPONSE:"));
    }

    #[test]
    fn test_placeholder_in_article_is_kept() {
        let article = "Templates often use {{ARTICLE}} as a marker.";
        let prompt = Template::Conversation.render(article);
        assert!(prompt.contains(article));
        assert_eq!(prompt.matches(PLACEHOLDER).count(), 1);
    }
}
