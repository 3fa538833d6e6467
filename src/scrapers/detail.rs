//! Release body extraction.

use crate::utils::clean_text;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

/// Content areas to try, most specific first.
static BODY_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "div[class*='article-body']",
        "article",
        "div[class*='release-body']",
    ]
    .iter()
    .map(|s| Selector::parse(s).unwrap())
    .collect()
});

/// Cleaned text of the first content area that yields any, or `None` when
/// every selector comes up empty.
///
/// Text nodes are concatenated as-is, so inline markup never splits a word;
/// whitespace in the source between blocks is what separates them.
pub fn extract_body(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    BODY_SELECTORS.iter().find_map(|selector| {
        let element = document.select(selector).next()?;
        let text = clean_text(&element.text().collect::<String>());
        (!text.is_empty()).then_some(text)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefers_article_body() {
        let html = r#"<html><body>
            <article>Outer wrapper text</article>
            <div class="col-lg-10 article-body">
              <p>CHICAGO, Feb. 3, 2025 /PRNewswire/ --</p>
              <p>Acme   opened
              a hub.</p>
            </div>
        </body></html>"#;
        assert_eq!(
            extract_body(html).unwrap(),
            "CHICAGO, Feb. 3, 2025 /PRNewswire/ -- Acme opened a hub."
        );
    }

    #[test]
    fn test_falls_through_empty_areas() {
        let html = r#"<html><body>
            <div class="article-body">   </div>
            <div class="release-body container">Globex expands.</div>
        </body></html>"#;
        assert_eq!(extract_body(html).unwrap(), "Globex expands.");
    }

    #[test]
    fn test_article_tag_fallback() {
        let html = "<html><body><article>\n<p>Line one</p>\n<p>Line two</p>\n</article></body></html>";
        assert_eq!(extract_body(html).unwrap(), "Line one Line two");
    }

    #[test]
    fn test_inline_markup_does_not_split_text() {
        let html = r#"<html><body><div class="article-body"><p><b>CHICAGO</b>, Feb. 3 -- Acme<i>Corp</i> grew.</p></div></body></html>"#;
        assert_eq!(extract_body(html).unwrap(), "CHICAGO, Feb. 3 -- AcmeCorp grew.");
    }

    #[test]
    fn test_no_content_area() {
        assert_eq!(extract_body("<html><body><p>Cookie banner</p></body></html>"), None);
    }
}
