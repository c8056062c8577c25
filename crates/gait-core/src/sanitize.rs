//! Removal of editor-injected markup from message text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Result;
use crate::state::{Message, PanelChat};

/// Markdown links to editor commands, e.g. `[Apply](command:editor.apply?...)`.
static COMMAND_LINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[[^\]]*\]\(command:[^)]*\)").expect("Invalid command link regex"));

/// HTML comments the editor uses as invisible anchors.
static HTML_COMMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("Invalid HTML comment regex"));

#[derive(Debug, Clone, Default)]
pub struct Sanitizer {
    extra: Vec<Regex>,
}

impl Sanitizer {
    /// Builds a sanitizer with additional removal patterns.
    ///
    /// # Errors
    ///
    /// Returns [`crate::GaitError::Config`] when a pattern does not compile.
    pub fn with_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let extra = patterns
            .iter()
            .map(|p| Regex::new(p.as_ref()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { extra })
    }

    pub fn clean(&self, text: &str) -> String {
        let mut out = COMMAND_LINK.replace_all(text, "").into_owned();
        out = HTML_COMMENT.replace_all(&out, "").into_owned();
        for pattern in &self.extra {
            out = pattern.replace_all(&out, "").into_owned();
        }
        out.trim().to_string()
    }

    pub fn clean_message(&self, message: &mut Message) {
        message.message_text = self.clean(&message.message_text);
        message.response_text = self.clean(&message.response_text);
    }

    pub fn clean_panel_chat(&self, chat: &mut PanelChat) {
        for message in &mut chat.messages {
            self.clean_message(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_command_links_and_comments() {
        let sanitizer = Sanitizer::default();
        let text = "  Here is the fix [Apply](command:cursor.apply?%5B1%5D) <!-- anchor:42 -->\n";
        assert_eq!(sanitizer.clean(text), "Here is the fix");
    }

    #[test]
    fn test_keeps_regular_links() {
        let sanitizer = Sanitizer::default();
        assert_eq!(
            sanitizer.clean("see [docs](https://example.com)"),
            "see [docs](https://example.com)"
        );
    }

    #[test]
    fn test_extra_patterns() {
        let sanitizer = Sanitizer::with_patterns(&[r"@workspace\s*"]).unwrap();
        let mut message = Message::new("m", "@workspace explain this", " ok ");
        sanitizer.clean_message(&mut message);
        assert_eq!(message.message_text, "explain this");
        assert_eq!(message.response_text, "ok");
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = Sanitizer::with_patterns(&["("]).unwrap_err();
        assert!(matches!(err, crate::GaitError::Config(_)));
    }
}
