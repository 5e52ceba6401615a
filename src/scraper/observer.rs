use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};
use url::Url;

use crate::dom;
use crate::domain::ListingProduct;
use crate::scraper::{PageScraper, ScraperConfig};

/// Waits for listing cards to appear in a page that rendered without them.
///
/// Each message on the mutation channel is a DOM snapshot taken after a
/// change. The observer looks at no more than `max_observations` snapshots
/// and no longer than `window`, then disconnects by dropping the receiver.
#[derive(Debug, Clone)]
pub struct ListingObserver {
    max_observations: usize,
    window: Duration,
}

/// Cards found by the observer, with the snapshot they were tagged in
#[derive(Debug, Clone)]
pub struct ObservedListing {
    pub html: String,
    pub products: Vec<ListingProduct>,
    pub observations: usize,
}

impl ListingObserver {
    pub fn new(max_observations: usize, window: Duration) -> Self {
        Self {
            max_observations,
            window,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.max_observations, config.observe_window())
    }

    pub async fn wait_for_listing(
        &self,
        scraper: &PageScraper,
        page_url: &Url,
        mut mutations: mpsc::Receiver<String>,
    ) -> Option<ObservedListing> {
        let deadline = tokio::time::Instant::now() + self.window;
        let mut observations = 0;

        while observations < self.max_observations {
            let snapshot = match tokio::time::timeout_at(deadline, mutations.recv()).await {
                Ok(Some(snapshot)) => snapshot,
                Ok(None) => {
                    debug!("Mutation source for {} closed", page_url);
                    break;
                }
                Err(_) => {
                    debug!("Observation window for {} elapsed", page_url);
                    break;
                }
            };
            observations += 1;

            let (products, html) = scrape_snapshot(scraper, page_url, &snapshot);
            if !products.is_empty() {
                info!(
                    "{} listing cards appeared on {} after {} observations",
                    products.len(),
                    page_url,
                    observations
                );
                return Some(ObservedListing {
                    html,
                    products,
                    observations,
                });
            }
        }

        debug!(
            "No listing cards on {} after {} observations",
            page_url, observations
        );
        None
    }
}

fn scrape_snapshot(scraper: &PageScraper, page_url: &Url, snapshot: &str) -> (Vec<ListingProduct>, String) {
    let document = dom::parse(snapshot);
    let products = scraper.scrape_listing(&document, page_url);
    (products, dom::serialize(&document))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;

    fn page_with_cards(n: usize) -> String {
        let cards: String = (0..n)
            .map(|i| {
                format!(
                    r#"<div data-component-type="s-search-result"><h2><a href="/dp/B{i}"><span>Item {i}</span></a></h2></div>"#
                )
            })
            .collect();
        format!("<div class='s-main-slot'>{}</div>", cards)
    }

    fn url() -> Url {
        Url::parse("https://www.amazon.in/s?k=atta").unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_cards_inserted_later_are_picked_up_and_observer_disconnects() {
        let (tx, rx) = mpsc::channel(16);
        let producer = tokio::spawn(async move {
            tx.send(page_with_cards(0)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(300)).await;
            tx.send(page_with_cards(5)).await.unwrap();
            // Resolves once the observer drops its receiver
            tx.closed().await;
        });

        let observer = ListingObserver::new(8, Duration::from_secs(10));
        let scraper = PageScraper::new(Platform::Amazon);
        let found = observer.wait_for_listing(&scraper, &url(), rx).await.unwrap();

        assert_eq!(found.products.len(), 5);
        assert_eq!(found.observations, 2);
        assert!(found.html.contains("data-compliance-id"));
        producer.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_observation_cap() {
        let (tx, rx) = mpsc::channel(16);
        for _ in 0..3 {
            tx.send(page_with_cards(0)).await.unwrap();
        }
        tx.send(page_with_cards(2)).await.unwrap();

        let observer = ListingObserver::new(3, Duration::from_secs(10));
        let scraper = PageScraper::new(Platform::Amazon);
        assert!(observer.wait_for_listing(&scraper, &url(), rx).await.is_none());
        assert!(tx.is_closed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_elapses_without_mutations() {
        let (tx, rx) = mpsc::channel::<String>(1);
        let observer = ListingObserver::new(8, Duration::from_secs(2));
        let scraper = PageScraper::new(Platform::Amazon);

        let start = tokio::time::Instant::now();
        assert!(observer.wait_for_listing(&scraper, &url(), rx).await.is_none());
        assert!(start.elapsed() >= Duration::from_secs(2));
        assert!(tx.is_closed());
    }
}
