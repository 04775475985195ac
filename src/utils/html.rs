use ammonia;

/// Clean HTML content using the ammonia library.
///
/// Quiz titles, descriptions, prompts and explanations are rendered as rich
/// text by the web client. Safe tags (like <b>, <p>) survive, while <script>,
/// <iframe> and event-handler attributes are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_strips_scripts() {
        assert_eq!(clean_html("<b>Bold</b><script>alert(1)</script>"), "<b>Bold</b>");
    }

    #[test]
    fn test_clean_html_keeps_plain_text() {
        assert_eq!(clean_html("What is 2 + 2?"), "What is 2 + 2?");
    }
}
