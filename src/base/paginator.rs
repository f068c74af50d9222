//! # Fetch Paginator
//!
//! Drives the store's single-page fetch until the limit is reached or the
//! store stops returning a cursor.
//!
//! Pages are strictly sequential: a page's cursor is only known once the
//! previous response arrives. A page with zero items but a cursor is not
//! the end of the collection. If any page fails the whole fetch fails and
//! the items gathered so far are dropped.

use crate::observability::{log_event, BaseMetrics, Event};
use crate::query::Query;
use crate::store::{Page, PageRequest, Store, StoreResult};

use super::options::FetchOptions;

/// Multi-page fetch over one store
pub struct Paginator<'a, S: Store + ?Sized> {
    store: &'a S,
    base: &'a str,
    metrics: Option<&'a BaseMetrics>,
}

impl<'a, S: Store + ?Sized> Paginator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            base: "",
            metrics: None,
        }
    }

    /// Name used in log lines
    pub fn for_base(mut self, base: &'a str) -> Self {
        self.base = base;
        self
    }

    pub fn with_metrics(mut self, metrics: &'a BaseMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Fetch according to `options`, stitching pages into one result.
    ///
    /// The returned page's `count` is the sum of the per-page counts and
    /// equals `items.len()`; `last` is the cursor after the final page.
    pub async fn fetch(&self, query: Option<Query>, options: &FetchOptions) -> StoreResult<Page> {
        let mut accumulated = Page::default();
        let mut request = PageRequest {
            limit: options.limit,
            last: options.last.clone(),
            desc: options.desc,
        };
        let mut pages = 0usize;

        loop {
            let page = match self.store.fetch(query.clone(), request).await {
                Ok(page) => page,
                Err(e) => {
                    if let Some(metrics) = self.metrics {
                        metrics.increment_store_errors();
                    }
                    let dropped = accumulated.count.to_string();
                    let error = e.to_string();
                    let pages = pages.to_string();
                    log_event(
                        Event::FetchFailed,
                        &[
                            ("base", self.base),
                            ("dropped_items", dropped.as_str()),
                            ("error", error.as_str()),
                            ("pages", pages.as_str()),
                        ],
                    );
                    return Err(e);
                }
            };
            pages += 1;

            // Counted from the items so the totals always agree.
            let count = page.items.len();
            if let Some(metrics) = self.metrics {
                metrics.record_page(count as u64);
            }
            let count_field = count.to_string();
            log_event(
                Event::PageFetched,
                &[
                    ("base", self.base),
                    ("count", count_field.as_str()),
                    ("has_more", if page.last.is_some() { "true" } else { "false" }),
                ],
            );

            accumulated.items.extend(page.items);
            accumulated.count += count;
            accumulated.last = page.last;

            let cursor = match &accumulated.last {
                Some(cursor) if options.auto_paginate => cursor.clone(),
                _ => break,
            };
            if options.is_satisfied(accumulated.count) {
                break;
            }

            request = PageRequest {
                limit: options.remaining(accumulated.count),
                last: Some(cursor),
                desc: options.desc,
            };
        }

        let count = accumulated.count.to_string();
        let pages = pages.to_string();
        log_event(
            Event::FetchComplete,
            &[
                ("base", self.base),
                ("count", count.as_str()),
                ("pages", pages.as_str()),
            ],
        );
        Ok(accumulated)
    }
}
