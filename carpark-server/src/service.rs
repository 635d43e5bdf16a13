//! Staleness-aware aggregation over the carpark API.
//!
//! [`CarparkService`] is what the web layer talks to. It exposes four
//! operations, each returning a value or "unavailable" and never an error:
//!
//! - [`get_all_ids`](CarparkService::get_all_ids): facility directory, cached
//! - [`get_detail`](CarparkService::get_detail): one facility, retried, uncached
//! - [`get_no_update_set`](CarparkService::get_no_update_set): stale ids, cached
//! - [`get_locations`](CarparkService::get_locations): live facilities with
//!   coordinates, cached
//!
//! The no-update sweep and the locations build each fetch details on their
//! own, so warming both caches costs roughly two upstream calls per
//! facility. Keeping the passes separate lets each cache expire on its own
//! schedule.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheConfig, TtlCache};
use crate::clock::Clock;
use crate::domain::{GeoPoint, OccupancyStatus, StalenessPolicy};
use crate::upstream::{FacilityDetail, FacilityDirectory, UpstreamClient};

/// Default number of attempts per detail fetch.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Ids of facilities considered not updating.
pub type NoUpdateSet = BTreeSet<String>;

/// A live facility with known coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CarparkLocation {
    pub facility_id: String,
    pub name: String,
    pub location: GeoPoint,
    /// Capacity as of the fetch that built this entry.
    pub total_spots: Option<i64>,
    /// Occupied spots as of the same fetch.
    pub occupied: Option<i64>,
}

impl CarparkLocation {
    /// Status as of the fetch that built this entry.
    pub fn status(&self) -> OccupancyStatus {
        match (self.total_spots, self.occupied) {
            (Some(total), Some(occupied)) => OccupancyStatus::from_counts(total, occupied),
            _ => OccupancyStatus::NoData,
        }
    }
}

/// Every live facility with coordinates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocationsView {
    pub carparks: Vec<CarparkLocation>,
}

/// Carpark API access with caching and staleness filtering.
pub struct CarparkService {
    client: UpstreamClient,
    clock: Arc<dyn Clock>,
    staleness: StalenessPolicy,
    retry_count: u32,
    directory: TtlCache<(), Arc<FacilityDirectory>>,
    no_update: TtlCache<(), Arc<NoUpdateSet>>,
    locations: TtlCache<(), Arc<LocationsView>>,
}

impl CarparkService {
    /// Create a new service. All three caches share `cache_config`.
    pub fn new(
        client: UpstreamClient,
        clock: Arc<dyn Clock>,
        cache_config: &CacheConfig,
        staleness: StalenessPolicy,
    ) -> Self {
        Self {
            client,
            clock,
            staleness,
            retry_count: DEFAULT_RETRY_COUNT,
            directory: TtlCache::new(cache_config),
            no_update: TtlCache::new(cache_config),
            locations: TtlCache::new(cache_config),
        }
    }

    /// Set the number of attempts per detail fetch.
    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// The staleness rule in force.
    pub fn staleness(&self) -> &StalenessPolicy {
        &self.staleness
    }

    /// Facility id → name for every facility the API knows.
    ///
    /// `None` means the API could not be reached or listed no facilities;
    /// it is never cached, so the next call asks again.
    pub async fn get_all_ids(&self) -> Option<Arc<FacilityDirectory>> {
        self.directory
            .get_or_compute((), async {
                let directory = self.fetch_directory().await?;
                info!(facilities = directory.len(), "fetched facility directory");
                Some(Arc::new(directory))
            })
            .await
    }

    async fn fetch_directory(&self) -> Option<FacilityDirectory> {
        let body = self.client.request(self.client.directory_url()).await?;
        let Value::Object(entries) = body else {
            warn!("facility directory is not a JSON object");
            return None;
        };
        if entries.is_empty() {
            warn!("facility directory is empty");
            return None;
        }

        let directory = entries
            .into_iter()
            .map(|(id, name)| {
                let name = match name {
                    Value::String(name) => name,
                    other => other.to_string(),
                };
                (id, name)
            })
            .collect();
        Some(directory)
    }

    /// Fetch one facility's detail record, retrying empty results.
    pub async fn get_detail(&self, facility_id: &str) -> Option<FacilityDetail> {
        self.get_detail_with_retries(facility_id, self.retry_count)
            .await
    }

    /// Fetch one facility's detail record with up to `retry_count` attempts.
    ///
    /// An attempt fails when the request fails or the body is not a
    /// non-empty JSON object. Never cached.
    pub async fn get_detail_with_retries(
        &self,
        facility_id: &str,
        retry_count: u32,
    ) -> Option<FacilityDetail> {
        let url = self.client.facility_url(facility_id);

        for attempt in 0..retry_count {
            if attempt > 0 {
                info!(
                    facility_id,
                    attempt,
                    of = retry_count - 1,
                    "retrying facility detail"
                );
            }

            let Some(body) = self.client.request(url.clone()).await else {
                continue;
            };
            if !is_non_empty_object(&body) {
                debug!(facility_id, "empty facility detail");
                continue;
            }

            match serde_json::from_value::<FacilityDetail>(body) {
                Ok(detail) => {
                    debug!(facility_id, "fetched facility detail");
                    return Some(detail);
                }
                Err(e) => warn!(facility_id, error = %e, "unreadable facility detail"),
            }
        }

        None
    }

    /// Sweep every facility in `directory` and collect the stale ones.
    ///
    /// A facility is included when its detail cannot be fetched or its
    /// last update is older than the staleness threshold at `now`. One
    /// sequential fetch per facility, so this takes at least
    /// `len / max_per_second` seconds.
    pub async fn compute_no_update_set(
        &self,
        directory: &FacilityDirectory,
        now: DateTime<Utc>,
    ) -> NoUpdateSet {
        let mut stale = NoUpdateSet::new();

        for facility_id in directory.keys() {
            debug!(facility_id = %facility_id, "checking facility");
            let no_update = match self.get_detail(facility_id).await {
                Some(detail) => self.staleness.is_stale(&detail, now),
                None => true,
            };
            if no_update {
                info!(facility_id = %facility_id, "facility is no-update");
                stale.insert(facility_id.clone());
            }
        }

        stale
    }

    /// Ids of facilities that have not updated recently.
    ///
    /// Empty (and not cached) when the directory is unavailable.
    pub async fn get_no_update_set(&self) -> Arc<NoUpdateSet> {
        self.no_update
            .get_or_compute((), async {
                let directory = self.get_all_ids().await?;
                let stale = self.compute_no_update_set(&directory, self.clock.now()).await;
                info!(
                    facilities = directory.len(),
                    no_update = stale.len(),
                    "computed no-update set"
                );
                Some(Arc::new(stale))
            })
            .await
            .unwrap_or_default()
    }

    /// Every facility that is updating and has usable coordinates.
    ///
    /// `None` when the directory is unavailable. Facilities whose detail
    /// cannot be fetched or has no usable location are left out.
    pub async fn get_locations(&self) -> Option<Arc<LocationsView>> {
        self.locations
            .get_or_compute((), async {
                let view = self.build_locations().await?;
                info!(carparks = view.carparks.len(), "built locations view");
                Some(Arc::new(view))
            })
            .await
    }

    async fn build_locations(&self) -> Option<LocationsView> {
        let directory = self.get_all_ids().await?;
        let no_update = self.get_no_update_set().await;

        let mut carparks = Vec::new();
        for (facility_id, name) in directory.iter() {
            if no_update.contains(facility_id) {
                continue;
            }

            let Some(detail) = self.get_detail(facility_id).await else {
                continue;
            };

            let location = match detail.coordinates() {
                Ok(Some((latitude, longitude))) => GeoPoint::new(latitude, longitude),
                Ok(None) => continue,
                Err(e) => {
                    warn!(facility_id = %facility_id, error = %e, "skipping carpark");
                    continue;
                }
            };

            carparks.push(CarparkLocation {
                facility_id: facility_id.clone(),
                name: name.clone(),
                location,
                total_spots: detail.total_spots().ok(),
                occupied: detail.occupied().ok(),
            });
        }

        Some(LocationsView { carparks })
    }

    /// Drop every cached view, forcing the next calls to refetch.
    pub fn invalidate_all(&self) {
        self.directory.invalidate_all();
        self.no_update.invalidate_all();
        self.locations.invalidate_all();
    }
}

fn is_non_empty_object(value: &Value) -> bool {
    matches!(value, Value::Object(map) if !map.is_empty())
}
