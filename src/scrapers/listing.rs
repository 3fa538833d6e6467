//! Listing page parsing.
//!
//! A listing page is a grid of `div.card` elements, each holding a headline
//! `<h3>` whose first text node is the title and whose `<small>` child is
//! the publication date, plus an anchor to the release. Relative links are
//! resolved against the listing page URL.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use url::Url;

static CARD: Lazy<Selector> = Lazy::new(|| Selector::parse("div.card").unwrap());
static CARD_LINK: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.newsreleaseconsolidatelink[href]").unwrap());
static HEADLINE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3").unwrap());
static HEADLINE_DATE: Lazy<Selector> = Lazy::new(|| Selector::parse("h3 > small").unwrap());
static NEXT_PAGE: Lazy<Selector> = Lazy::new(|| Selector::parse("li.next a[href]").unwrap());

/// One release as shown on a listing page. Fields may be empty; the walker
/// decides what to keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Headline text with only its ends trimmed. Inner whitespace is kept
    /// as printed so deduplication sees the exact title.
    pub title: String,
    pub link: Option<Url>,
    pub raw_date: String,
}

#[derive(Debug, Default)]
pub struct ListingPage {
    pub cards: Vec<Card>,
    pub next_page: Option<Url>,
}

/// Extract every card and the "next page" link from a listing page.
pub fn parse_listing(html: &str, page_url: &Url) -> ListingPage {
    let document = Html::parse_document(html);

    let cards = document
        .select(&CARD)
        .map(|card| Card {
            title: headline(card),
            link: card
                .select(&CARD_LINK)
                .next()
                .and_then(|a| a.value().attr("href"))
                .and_then(|href| page_url.join(href).ok()),
            raw_date: card
                .select(&HEADLINE_DATE)
                .next()
                .map(|small| small.text().collect::<String>().trim().to_string())
                .unwrap_or_default(),
        })
        .collect();

    let next_page = document
        .select(&NEXT_PAGE)
        .next()
        .and_then(|a| a.value().attr("href"))
        .and_then(|href| page_url.join(href).ok());

    ListingPage { cards, next_page }
}

/// First non-blank text node directly inside a headline, trimmed. The
/// `<small>` date is a child element, so it is not part of the title.
fn headline(card: ElementRef<'_>) -> String {
    card.select(&HEADLINE)
        .flat_map(|h3| h3.children())
        .filter_map(|node| node.value().as_text().map(|t| t.trim().to_string()))
        .find(|t| !t.is_empty())
        .unwrap_or_default()
}

/// The listing page number from the `page` query parameter, or `unknown`.
pub fn page_label(url: &Url) -> String {
    url.query_pairs()
        .find(|(k, _)| k == "page")
        .map(|(_, v)| v.into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clean_text;

    const LISTING: &str = r#"
        <html><body>
          <div class="row">
            <div class="card col-view">
              <a class="newsreleaseconsolidatelink display-outline" href="/news-releases/acme-opens-hub-302001.html">
                <h3><small>Feb 03, 2025, 10:00 ET</small>
                  Acme Opens
                  Midwest Hub
                </h3>
              </a>
            </div>
            <div class="card col-view">
              <a class="newsreleaseconsolidatelink" href="https://www.prnewswire.com/news-releases/globex-302002.html">
                <h3><small>09:24 ET</small>Globex Expands Fleet</h3>
              </a>
            </div>
            <div class="card col-view">
              <h3><small>08:00 ET</small>No link here</h3>
            </div>
          </div>
          <ul class="pagination"><li class="next"><a href="?page=2&amp;pagesize=25">Next</a></li></ul>
        </body></html>
    "#;

    fn base() -> Url {
        Url::parse("https://www.prnewswire.com/news-releases/list/?page=1&pagesize=25").unwrap()
    }

    #[test]
    fn test_parse_listing_cards() {
        let page = parse_listing(LISTING, &base());
        assert_eq!(page.cards.len(), 3);

        let first = &page.cards[0];
        assert!(first.title.starts_with("Acme Opens\n"));
        assert!(first.title.ends_with("Midwest Hub"));
        assert_eq!(clean_text(&first.title), "Acme Opens Midwest Hub");
        assert_eq!(first.raw_date, "Feb 03, 2025, 10:00 ET");
        assert_eq!(
            first.link.as_ref().unwrap().as_str(),
            "https://www.prnewswire.com/news-releases/acme-opens-hub-302001.html"
        );

        assert_eq!(page.cards[1].title, "Globex Expands Fleet");
        assert_eq!(page.cards[1].raw_date, "09:24 ET");

        assert_eq!(page.cards[2].title, "No link here");
        assert!(page.cards[2].link.is_none());
    }

    #[test]
    fn test_parse_listing_next_page() {
        let page = parse_listing(LISTING, &base());
        assert_eq!(
            page.next_page.unwrap().as_str(),
            "https://www.prnewswire.com/news-releases/list/?page=2&pagesize=25"
        );
    }

    #[test]
    fn test_last_page_has_no_next() {
        let page = parse_listing("<html><body><div class='card'></div></body></html>", &base());
        assert!(page.next_page.is_none());
        assert_eq!(page.cards.len(), 1);
        assert_eq!(page.cards[0].title, "");
        assert_eq!(page.cards[0].raw_date, "");
    }

    #[test]
    fn test_title_keeps_inner_whitespace() {
        let html = r#"<div class="card"><a class="newsreleaseconsolidatelink" href="/a.html">
            <h3><small>09:24 ET</small>  Acme  Opens Hub  </h3></a></div>"#;
        let page = parse_listing(html, &base());
        assert_eq!(page.cards[0].title, "Acme  Opens Hub");
    }

    #[test]
    fn test_page_label() {
        assert_eq!(page_label(&base()), "1");
        let no_query = Url::parse("https://www.prnewswire.com/news-releases/").unwrap();
        assert_eq!(page_label(&no_query), "unknown");
    }
}
