//! The two-phase crawl: listing pages, then release detail pages.
//!
//! # Control flow
//!
//! [`ListingWalker`] owns an explicit frontier of listing URLs and the
//! session's [`DedupLedger`]. Each dequeued page is fetched and parsed;
//! every accepted card becomes an [`ArticleStub`], and only after the whole
//! page has been processed is its "next page" link put back on the
//! frontier. Seed pages start independent chains, and a listing URL is
//! fetched at most once even when chains converge.
//!
//! Stubs flow lazily into [`DetailFetcher`], which runs up to
//! `concurrency` detail requests at once on the same task. Results are
//! collected in discovery order so export ties stay stable.
//!
//! Every failure here is local: a listing page that cannot be fetched ends
//! that branch, a detail page that cannot be fetched drops that article.

use crate::api::AskAsync;
use crate::classify::Classifier;
use crate::config::Config;
use crate::error::CrawlError;
use crate::fetch::PageFetcher;
use crate::ledger::DedupLedger;
use crate::models::{ArticleRecord, ArticleStub};
use crate::outputs::csv::{CsvExporter, write_artifact};
use crate::scrapers::{detail, listing};
use crate::utils::clean_text;
use chrono::Local;
use futures::stream::{self, Stream, StreamExt};
use std::cell::Cell;
use std::collections::{HashSet, VecDeque};
use std::future::Future;
use std::path::Path;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Counters for one crawl session, logged when it ends.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub pages_fetched: Cell<usize>,
    pub pages_failed: Cell<usize>,
    pub cards_incomplete: Cell<usize>,
    pub cards_offsite: Cell<usize>,
    pub duplicates_rejected: Cell<usize>,
    pub stubs_emitted: Cell<usize>,
    pub details_failed: Cell<usize>,
    pub empty_bodies: Cell<usize>,
    pub classification_fallbacks: Cell<usize>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// Restricts which hosts the crawl follows links into.
#[derive(Debug, Clone, Default)]
pub struct DomainFilter {
    allowed: Vec<String>,
}

impl DomainFilter {
    pub fn new(allowed: &[String]) -> Self {
        DomainFilter {
            allowed: allowed.iter().map(|d| d.to_ascii_lowercase()).collect(),
        }
    }

    /// A host is allowed when it equals an allowed domain or is a subdomain
    /// of one. An empty filter allows everything.
    pub fn allows(&self, url: &Url) -> bool {
        if self.allowed.is_empty() {
            return true;
        }
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        self.allowed
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{d}")))
    }
}

/// Walks listing pages and yields deduplicated article stubs.
pub struct ListingWalker<'a, F> {
    fetcher: &'a F,
    report: &'a CrawlReport,
    filter: DomainFilter,
    frontier: VecDeque<Url>,
    queued: HashSet<String>,
    ledger: DedupLedger,
    pending: VecDeque<ArticleStub>,
}

impl<'a, F> ListingWalker<'a, F>
where
    F: PageFetcher,
{
    pub fn new(
        fetcher: &'a F,
        seeds: impl IntoIterator<Item = Url>,
        filter: DomainFilter,
        report: &'a CrawlReport,
    ) -> Self {
        let mut walker = ListingWalker {
            fetcher,
            report,
            filter,
            frontier: VecDeque::new(),
            queued: HashSet::new(),
            ledger: DedupLedger::new(),
            pending: VecDeque::new(),
        };
        for seed in seeds {
            walker.enqueue(seed);
        }
        walker
    }

    fn enqueue(&mut self, url: Url) {
        if self.queued.insert(url.as_str().to_string()) {
            self.frontier.push_back(url);
        } else {
            debug!(%url, "Listing page already queued");
        }
    }

    /// The next stub, fetching listing pages as needed. `None` once every
    /// pagination chain is exhausted.
    pub async fn next_stub(&mut self) -> Option<ArticleStub> {
        loop {
            if let Some(stub) = self.pending.pop_front() {
                bump(&self.report.stubs_emitted);
                return Some(stub);
            }
            let Some(url) = self.frontier.pop_front() else {
                info!(
                    unique_articles = self.ledger.accepted(),
                    listing_pages = self.queued.len(),
                    "Listing walk finished"
                );
                return None;
            };
            self.visit(url).await;
        }
    }

    #[instrument(level = "info", skip_all, fields(url = %url))]
    async fn visit(&mut self, url: Url) {
        let html = match self.fetcher.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                bump(&self.report.pages_failed);
                warn!(error = %e, "Skipping listing page");
                return;
            }
        };
        bump(&self.report.pages_fetched);

        let page = listing::parse_listing(&html, &url);
        let label = listing::page_label(&url);
        let mut accepted = 0usize;

        for card in page.cards {
            let Some(link) = card.link.filter(|_| !card.title.is_empty()) else {
                bump(&self.report.cards_incomplete);
                continue;
            };
            if !self.filter.allows(&link) {
                bump(&self.report.cards_offsite);
                debug!(%link, "Ignoring offsite article link");
                continue;
            }
            if !self.ledger.should_accept(&card.title, link.as_str()) {
                bump(&self.report.duplicates_rejected);
                debug!(title = %card.title, %link, "Duplicate article");
                continue;
            }
            self.pending.push_back(ArticleStub {
                page: label.clone(),
                title: clean_text(&card.title),
                link: link.to_string(),
                raw_date: card.raw_date,
            });
            accepted += 1;
        }
        info!(page = %label, accepted, "Processed listing page");

        match page.next_page {
            Some(next) if self.filter.allows(&next) => self.enqueue(next),
            Some(next) => debug!(%next, "Ignoring offsite next page"),
            None => debug!("No next page; chain ends"),
        }
    }

    /// Turn the walker into a lazy stream of stubs.
    pub fn into_stream(self) -> impl Stream<Item = ArticleStub> + 'a
    where
        F: 'a,
    {
        stream::unfold(self, |mut walker| async move {
            walker.next_stub().await.map(|stub| (stub, walker))
        })
    }
}

/// Reads a release page and asks the classifier about it.
pub struct DetailFetcher<'a, F, A> {
    fetcher: &'a F,
    classifier: &'a Classifier<A>,
    report: &'a CrawlReport,
}

impl<'a, F, A> DetailFetcher<'a, F, A>
where
    F: PageFetcher,
    A: AskAsync<Response = String>,
{
    pub fn new(fetcher: &'a F, classifier: &'a Classifier<A>, report: &'a CrawlReport) -> Self {
        DetailFetcher {
            fetcher,
            classifier,
            report,
        }
    }

    /// Build the full record for `stub`. Fails only when the page itself
    /// cannot be retrieved; a page without recognizable body text still
    /// yields a record with empty `full_text`.
    #[instrument(level = "info", skip_all, fields(link = %stub.link))]
    pub async fn fetch(&self, stub: ArticleStub) -> Result<ArticleRecord, CrawlError> {
        let url = Url::parse(&stub.link).map_err(|e| CrawlError::fetch(stub.link.as_str(), e))?;
        let html = self.fetcher.fetch(&url).await?;

        let full_text = detail::extract_body(&html).unwrap_or_else(|| {
            bump(&self.report.empty_bodies);
            warn!("No content area matched; keeping article with empty body");
            String::new()
        });

        let classification = self.classifier.classify(&stub.title, &full_text).await;
        if classification.fell_back {
            bump(&self.report.classification_fallbacks);
        }

        debug!(
            bytes = full_text.len(),
            categories = classification.categories.len(),
            "Built article record"
        );
        Ok(ArticleRecord::from_stub(
            stub,
            classification.categories,
            classification.summary,
            full_text,
        ))
    }
}

/// Run one crawl session to completion and return records in discovery
/// order.
#[instrument(level = "info", skip_all, fields(seeds = seeds.len(), concurrency = concurrency))]
pub async fn crawl<F, A>(
    fetcher: &F,
    classifier: &Classifier<A>,
    seeds: Vec<Url>,
    filter: DomainFilter,
    concurrency: usize,
    report: &CrawlReport,
) -> Vec<ArticleRecord>
where
    F: PageFetcher,
    A: AskAsync<Response = String>,
{
    let details = DetailFetcher::new(fetcher, classifier, report);
    let walker = ListingWalker::new(fetcher, seeds, filter, report);

    let records: Vec<ArticleRecord> = walker
        .into_stream()
        .map(|stub| details.fetch(stub))
        .buffered(concurrency.max(1))
        .filter_map(|result| async move {
            match result {
                Ok(record) => Some(record),
                Err(e) => {
                    bump(&report.details_failed);
                    warn!(error = %e, "Dropping article");
                    None
                }
            }
        })
        .collect()
        .await;

    info!(
        records = records.len(),
        pages_fetched = report.pages_fetched.get(),
        pages_failed = report.pages_failed.get(),
        stubs = report.stubs_emitted.get(),
        duplicates = report.duplicates_rejected.get(),
        incomplete_cards = report.cards_incomplete.get(),
        offsite_cards = report.cards_offsite.get(),
        details_failed = report.details_failed.get(),
        empty_bodies = report.empty_bodies.get(),
        classification_fallbacks = report.classification_fallbacks.get(),
        "Crawl finished"
    );
    records
}

/// Run a session and write its artifact to `output`.
///
/// If `cancel` resolves first the session is dropped as a unit: nothing is
/// exported and [`CrawlError::Cancelled`] is returned. Returns the number of
/// records written.
#[instrument(level = "info", skip_all, fields(path = %output.display()))]
pub async fn crawl_to_artifact<F, A, C>(
    fetcher: &F,
    classifier: &Classifier<A>,
    seeds: Vec<Url>,
    config: &Config,
    mut exporter: CsvExporter,
    output: &Path,
    cancel: C,
) -> Result<usize, CrawlError>
where
    F: PageFetcher,
    A: AskAsync<Response = String>,
    C: Future<Output = ()>,
{
    let report = CrawlReport::default();
    let filter = DomainFilter::new(&config.allowed_domains);

    let records = tokio::select! {
        records = crawl(fetcher, classifier, seeds, filter, config.concurrency, &report) => records,
        () = cancel => {
            warn!("Interrupted; discarding partial results");
            return Err(CrawlError::Cancelled);
        }
    };

    let count = records.len();
    for record in records {
        exporter.export_item(record);
    }
    let bytes = exporter.finish(Local::now().date_naive())?;
    write_artifact(output, &bytes).await?;
    Ok(count)
}
