//! Prompt construction for LLM structuring.

/// Placeholder replaced with the document text in prompt templates.
pub const TEXT_PLACEHOLDER: &str = "{text}";

/// Default instruction: split into logically complete blocks, keep the
/// meaning, make the structure readable, return only the text.
pub const DEFAULT_PROMPT_TEMPLATE: &str = "Разбей следующий текст на логически завершённые блоки.
Сохрани исходный смысл, но сделай структуру читаемой.
Верни только текст, без пояснений.

Текст:
{text}";

/// Render `template` (or the default one) with `text` substituted.
///
/// Only the template is scanned for the placeholder, so a document that
/// itself contains `{text}` is inserted verbatim.
pub fn build_prompt(template: Option<&str>, text: &str) -> String {
    template
        .unwrap_or(DEFAULT_PROMPT_TEMPLATE)
        .replace(TEXT_PLACEHOLDER, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompt_embeds_text_at_the_end() {
        let prompt = build_prompt(None, "Первый абзац.");
        assert!(prompt.starts_with("Разбей следующий текст"));
        assert!(prompt.ends_with("Текст:\nПервый абзац."));
        assert!(!prompt.contains(TEXT_PLACEHOLDER));
    }

    #[test]
    fn test_custom_template() {
        let prompt = build_prompt(Some("Summarize:\n{text}\nEnd."), "body");
        assert_eq!(prompt, "Summarize:\nbody\nEnd.");
    }

    #[test]
    fn test_placeholder_inside_document_is_kept() {
        let prompt = build_prompt(Some("<{text}>"), "literal {text} here");
        assert_eq!(prompt, "<literal {text} here>");
    }
}
