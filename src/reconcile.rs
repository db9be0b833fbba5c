//! Catalog reconciliation.
//!
//! One run loads the previous catalog and performer table, fetches fresh
//! records brand by brand up to each brand's quota, merges them over the old
//! table and assembles the new catalog:
//!
//! 1. previous catalog ids that still exist, in their old order (skipped on reseed)
//! 2. freshly fetched ids, in brand-list order then upstream order
//! 3. any remaining merged-table ids, in table order
//!
//! stopping at `max` and never repeating an id. The performer table is always
//! rewritten; the catalog only when its contents changed or a reseed happened.

use crate::apis::{ListingApi, PageRequest};
use crate::brand::same_brand_set;
use crate::constants::{MAX_PAGE_SIZE, PAGE_SAFETY_CAP};
use crate::error::{Result, SyncError};
use crate::metrics;
use crate::quota::{split_quota, BrandQuota};
use crate::storage::ArtifactStore;
use crate::types::{CatalogFile, PerformerRecord, PerformerTableFile};
use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    pub max: usize,
    pub page_size: u32,
    pub brands: Vec<String>,
    pub reseed: bool,
    /// Pause between consecutive upstream requests
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReseedReason {
    Requested,
    NoPreviousCatalog,
    BrandsChanged,
}

/// Why a brand's fetch loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStop {
    NoQuota,
    QuotaMet,
    Exhausted,
    UpstreamError,
    PageCap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandFetch {
    pub brand: String,
    pub quota: usize,
    pub fetched: usize,
    pub pages: u32,
    pub stop: FetchStop,
}

#[derive(Debug, Clone)]
pub struct SyncReport {
    pub run_id: Uuid,
    pub reseed: Option<ReseedReason>,
    pub fetches: Vec<BrandFetch>,
    pub catalog_ids: Vec<String>,
    pub catalog_written: bool,
    /// Final catalog size per record brand, in order of first appearance
    pub composition: Vec<(String, usize)>,
}

impl SyncReport {
    pub fn fetched_total(&self) -> usize {
        self.fetches.iter().map(|f| f.fetched).sum()
    }
}

/// Previous table overlaid with fresh records, keeping first-seen order
#[derive(Debug, Default)]
pub struct MergedTable {
    order: Vec<String>,
    records: HashMap<String, PerformerRecord>,
}

impl MergedTable {
    pub fn from_records(records: impl IntoIterator<Item = PerformerRecord>) -> Self {
        let mut table = Self::default();
        for record in records {
            table.upsert(record);
        }
        table
    }

    /// Insert or replace; a replaced record keeps its position.
    pub fn upsert(&mut self, record: PerformerRecord) {
        if !self.records.contains_key(&record.id) {
            self.order.push(record.id.clone());
        }
        self.records.insert(record.id.clone(), record);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&PerformerRecord> {
        self.records.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &String> {
        self.order.iter()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub fn decide_reseed(
    requested: bool,
    previous: Option<&CatalogFile>,
    brands: &[String],
) -> Option<ReseedReason> {
    if requested {
        return Some(ReseedReason::Requested);
    }
    let Some(previous) = previous else {
        return Some(ReseedReason::NoPreviousCatalog);
    };
    // Catalogs written without a brand list carry no basis for comparison
    if !previous.brands.is_empty() && !same_brand_set(&previous.brands, brands) {
        return Some(ReseedReason::BrandsChanged);
    }
    None
}

/// Build the ordered catalog. `previous` is `None` when reseeding.
pub fn assemble_catalog(
    previous: Option<&[String]>,
    fresh: &[PerformerRecord],
    merged: &MergedTable,
    max: usize,
) -> Vec<String> {
    let mut ids: Vec<String> = Vec::with_capacity(max.min(merged.len()));
    let mut used: HashSet<&str> = HashSet::new();

    for id in previous.unwrap_or_default() {
        if ids.len() >= max {
            break;
        }
        if merged.contains(id) && used.insert(id.as_str()) {
            ids.push(id.clone());
        }
    }

    for record in fresh {
        if ids.len() >= max {
            break;
        }
        if used.insert(record.id.as_str()) {
            ids.push(record.id.clone());
        }
    }

    for id in merged.ids() {
        if ids.len() >= max {
            break;
        }
        if used.insert(id.as_str()) {
            ids.push(id.clone());
        }
    }

    ids
}

/// Compare against the previous ids truncated to `max`, position by position.
pub fn catalog_changed(previous: Option<&CatalogFile>, ids: &[String], max: usize) -> bool {
    match previous {
        None => true,
        Some(previous) => {
            let keep = previous.ids.len().min(max);
            previous.ids[..keep] != *ids
        }
    }
}

fn composition(records: &[PerformerRecord]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for record in records {
        let brand = record.brand.as_deref().unwrap_or("unknown");
        match counts.iter_mut().find(|(b, _)| b == brand) {
            Some((_, n)) => *n += 1,
            None => counts.push((brand.to_string(), 1)),
        }
    }
    counts
}

/// Spaces consecutive upstream requests by a fixed delay
struct Pacer {
    delay: Duration,
    requests: usize,
}

impl Pacer {
    fn new(delay: Duration) -> Self {
        Self { delay, requests: 0 }
    }

    async fn wait(&mut self) {
        if self.requests > 0 && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.requests += 1;
    }
}

pub struct Reconciler<A> {
    api: A,
    store: ArtifactStore,
    options: ReconcileOptions,
}

impl<A: ListingApi> Reconciler<A> {
    pub fn new(api: A, store: ArtifactStore, options: ReconcileOptions) -> Self {
        Self {
            api,
            store,
            options,
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Run one full reconciliation. Artifacts are only written once every
    /// brand has been fetched.
    pub async fn run(&self) -> Result<SyncReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("sync", run_id = %run_id);
        self.run_inner(run_id).instrument(span).await
    }

    async fn run_inner(&self, run_id: Uuid) -> Result<SyncReport> {
        let options = &self.options;
        if options.brands.is_empty() {
            return Err(SyncError::Config("no brands to sync".to_string()));
        }

        let previous = self.store.load_catalog()?;
        let previous_records = self.store.load_performers()?;
        info!(
            "Starting sync: max={} brands={:?} previous_catalog={} previous_performers={}",
            options.max,
            options.brands,
            previous.as_ref().map_or(0, |c| c.ids.len()),
            previous_records.len()
        );

        let reseed = decide_reseed(options.reseed, previous.as_ref(), &options.brands);
        match reseed {
            Some(ReseedReason::BrandsChanged) => {
                let old = previous.as_ref().map(|c| c.brands.clone()).unwrap_or_default();
                warn!(
                    "Brand set changed from {:?} to {:?}; reseeding catalog order",
                    old, options.brands
                );
            }
            Some(ReseedReason::NoPreviousCatalog) => info!("No previous catalog; seeding a new one"),
            Some(ReseedReason::Requested) => info!("Reseed requested; previous order ignored"),
            None => debug!("Keeping previous catalog order"),
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut pacer = Pacer::new(options.delay);
        let mut fresh: Vec<PerformerRecord> = Vec::new();
        let mut fetches = Vec::new();
        for quota in split_quota(options.max, &options.brands) {
            let (records, fetch) = self.fetch_brand(&quota, &mut seen, &mut pacer).await?;
            fresh.extend(records);
            fetches.push(fetch);
        }

        let mut merged = MergedTable::from_records(previous_records);
        for record in &fresh {
            merged.upsert(record.clone());
        }

        let previous_ids = match (&reseed, &previous) {
            (None, Some(catalog)) => Some(catalog.ids.as_slice()),
            _ => None,
        };
        let ids = assemble_catalog(previous_ids, &fresh, &merged, options.max);

        let records: Vec<PerformerRecord> = ids
            .iter()
            .filter_map(|id| merged.get(id).cloned())
            .collect();
        let composition = composition(&records);

        self.store
            .write_performers(&PerformerTableFile::new(options.brands.clone(), records))?;
        info!(
            "Wrote {} performers to {}",
            ids.len(),
            self.store.performers_path().display()
        );

        let catalog_written =
            reseed.is_some() || catalog_changed(previous.as_ref(), &ids, options.max);
        if catalog_written {
            self.store.write_catalog(&CatalogFile::new(
                options.brands.clone(),
                options.max,
                ids.clone(),
            ))?;
            info!(
                "Wrote catalog of {} ids to {}",
                ids.len(),
                self.store.catalog_path().display()
            );
        } else {
            info!(
                "Catalog unchanged; leaving {} untouched",
                self.store.catalog_path().display()
            );
        }
        metrics::record_catalog(ids.len(), catalog_written);

        Ok(SyncReport {
            run_id,
            reseed,
            fetches,
            catalog_ids: ids,
            catalog_written,
            composition,
        })
    }

    #[instrument(skip(self, quota, seen, pacer), fields(brand = %quota.brand, quota = quota.quota))]
    async fn fetch_brand(
        &self,
        quota: &BrandQuota,
        seen: &mut HashSet<String>,
        pacer: &mut Pacer,
    ) -> Result<(Vec<PerformerRecord>, BrandFetch)> {
        let brand = quota.brand.as_str();
        let per_page = self.options.page_size.clamp(1, MAX_PAGE_SIZE);
        let mut records: Vec<PerformerRecord> = Vec::new();
        let mut pages: u32 = 0;

        let stop = if quota.quota == 0 {
            FetchStop::NoQuota
        } else {
            loop {
                if records.len() >= quota.quota {
                    break FetchStop::QuotaMet;
                }
                if pages >= PAGE_SAFETY_CAP {
                    warn!("Stopped after {} pages without filling quota", pages);
                    break FetchStop::PageCap;
                }
                pages += 1;
                pacer.wait().await;

                let request = PageRequest {
                    brand: brand.to_string(),
                    page: pages,
                    per_page,
                };
                let page = match self.api.fetch_page(&request).await {
                    Ok(page) => page,
                    Err(SyncError::Json(e)) => {
                        warn!("Malformed JSON on page {}, treating as empty: {}", pages, e);
                        metrics::record_page_failure(brand, "json");
                        Vec::new()
                    }
                    // A broken request template fails every brand the same way
                    Err(e @ SyncError::Config(_)) => return Err(e),
                    Err(e) => {
                        warn!("Page {} failed, no more results for this brand: {}", pages, e);
                        metrics::record_page_failure(brand, "upstream");
                        break FetchStop::UpstreamError;
                    }
                };
                metrics::record_page(brand, page.len());
                if page.is_empty() {
                    break FetchStop::Exhausted;
                }

                let mut skipped = 0usize;
                for raw in page {
                    let Some(record) = PerformerRecord::from_value(raw) else {
                        skipped += 1;
                        continue;
                    };
                    if !seen.insert(record.id.clone()) {
                        continue;
                    }
                    records.push(record);
                    if records.len() >= quota.quota {
                        break;
                    }
                }
                if skipped > 0 {
                    debug!("Skipped {} records without an identifier on page {}", skipped, pages);
                }
            }
        };

        info!(
            "Fetched {}/{} records over {} pages ({:?})",
            records.len(),
            quota.quota,
            pages,
            stop
        );
        let fetch = BrandFetch {
            brand: quota.brand.clone(),
            quota: quota.quota,
            fetched: records.len(),
            pages,
            stop,
        };
        Ok((records, fetch))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str) -> PerformerRecord {
        PerformerRecord::from_value(json!({ "id": id })).unwrap()
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn catalog(brands: &[&str], list: &[&str]) -> CatalogFile {
        CatalogFile::new(ids(brands), 10, ids(list))
    }

    #[test]
    fn keeps_surviving_ids_then_fills_from_fresh() {
        let merged = MergedTable::from_records(vec![record("1"), record("3"), record("4")]);
        let previous = ids(&["1", "2", "3"]);
        let out = assemble_catalog(Some(&previous), &[record("4")], &merged, 3);
        assert_eq!(out, ids(&["1", "3", "4"]));
    }

    #[test]
    fn reseed_orders_by_fresh_records_first() {
        let merged = MergedTable::from_records(vec![record("old"), record("b"), record("a")]);
        let out = assemble_catalog(None, &[record("a"), record("b")], &merged, 10);
        assert_eq!(out, ids(&["a", "b", "old"]));
    }

    #[test]
    fn never_exceeds_max_or_repeats() {
        let merged =
            MergedTable::from_records(["1", "2", "3", "4", "5"].into_iter().map(record));
        let previous = ids(&["2", "2", "1"]);
        let fresh = vec![record("1"), record("5"), record("3")];
        let out = assemble_catalog(Some(&previous), &fresh, &merged, 4);
        assert_eq!(out, ids(&["2", "1", "5", "3"]));
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut merged = MergedTable::from_records(vec![record("1"), record("2")]);
        let updated = PerformerRecord::from_value(json!({"id": "1", "nick": "new"})).unwrap();
        merged.upsert(updated);
        merged.upsert(record("3"));
        assert_eq!(merged.ids().cloned().collect::<Vec<_>>(), ids(&["1", "2", "3"]));
        assert_eq!(merged.get("1").unwrap().fields["nick"], json!("new"));
    }

    #[test]
    fn catalog_change_compares_truncated_previous() {
        let previous = catalog(&["x"], &["1", "2", "3"]);
        assert!(!catalog_changed(Some(&previous), &ids(&["1", "2", "3"]), 3));
        assert!(!catalog_changed(Some(&previous), &ids(&["1", "2"]), 2));
        assert!(catalog_changed(Some(&previous), &ids(&["1", "3", "2"]), 3));
        assert!(catalog_changed(Some(&previous), &ids(&["1", "2", "3", "4"]), 4));
        assert!(catalog_changed(None, &[], 3));
    }

    #[test]
    fn reseed_reasons() {
        let brands = ids(&["a", "b"]);
        let same = catalog(&["b", "a"], &["1"]);
        let changed = catalog(&["a", "c"], &["1"]);
        let unknown = catalog(&[], &["1"]);

        assert_eq!(decide_reseed(false, Some(&same), &brands), None);
        assert_eq!(decide_reseed(true, Some(&same), &brands), Some(ReseedReason::Requested));
        assert_eq!(
            decide_reseed(false, None, &brands),
            Some(ReseedReason::NoPreviousCatalog)
        );
        assert_eq!(
            decide_reseed(false, Some(&changed), &brands),
            Some(ReseedReason::BrandsChanged)
        );
        assert_eq!(decide_reseed(false, Some(&unknown), &brands), None);
    }

    #[test]
    fn composition_counts_by_record_brand() {
        let records = vec![
            PerformerRecord::from_value(json!({"id": "1", "systemSource": "Bonga"})).unwrap(),
            PerformerRecord::from_value(json!({"id": "2", "brand": "stripchat"})).unwrap(),
            PerformerRecord::from_value(json!({"id": "3", "source": "bongacams"})).unwrap(),
            record("4"),
        ];
        assert_eq!(
            composition(&records),
            vec![
                ("bongacams".to_string(), 2),
                ("stripchat".to_string(), 1),
                ("unknown".to_string(), 1)
            ]
        );
    }
}
