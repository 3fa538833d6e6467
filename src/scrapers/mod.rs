//! HTML extraction for PR Newswire listing and release pages.
//!
//! The crawl is two-phase, and so is this module:
//!
//! 1. **Listing**: [`listing::parse_listing`] turns a listing page into
//!    article cards plus the "next page" link
//! 2. **Detail**: [`detail::extract_body`] pulls the release text from a
//!    detail page
//!
//! Both are pure functions over HTML strings. Fetching, deduplication and
//! scheduling live in [`crate::crawl`].
//!
//! | Page | Selector | Yields |
//! |------|----------|--------|
//! | listing | `div.card` | one card per release |
//! | listing | `a.newsreleaseconsolidatelink` | detail link |
//! | listing | `h3` / `h3 > small` | headline / date text |
//! | listing | `li.next a` | next listing page |
//! | detail | `div[class*=article-body]`, `article`, `div[class*=release-body]` | body text, first non-empty wins |

pub mod detail;
pub mod listing;
