//! The region store.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::geometry::{bounding_box_center, normalize_polygon};
use crate::{LatLng, RegionError, RegionId, RegionMetrics, RegionRecord};

/// Result of [`RegionStore::attach_metrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// Metrics were stored on the record.
    Attached,
    /// The record already had metrics; nothing changed.
    AlreadyAttached,
    /// No record with that id exists (e.g. removed by a reset while the
    /// fetch was in flight); nothing changed.
    Missing,
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<RegionRecord>,
    last_id: i64,
}

/// Insertion-ordered collection of regions.
///
/// Exclusively owns its [`RegionRecord`]s. Readers get clones via
/// [`RegionStore::list`]; the only mutations are [`RegionStore::add`],
/// [`RegionStore::attach_metrics`], [`RegionStore::remove`] and
/// [`RegionStore::remove_all`].
#[derive(Debug, Default)]
pub struct RegionStore {
    inner: RwLock<Inner>,
}

impl RegionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a region with empty metrics and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the polygon is invalid.
    pub fn add(&self, geometry: Vec<LatLng>) -> Result<RegionId, RegionError> {
        self.add_record(geometry).map(|record| record.id)
    }

    /// Creates a region with empty metrics and returns a copy of the
    /// stored record, normalized geometry included.
    ///
    /// The center is computed synchronously from the bounding box of the
    /// geometry. Ids are millisecond timestamps, bumped when needed so
    /// that they are strictly increasing within this store.
    ///
    /// # Errors
    ///
    /// Returns [`RegionError`] if the polygon is invalid.
    pub fn add_record(&self, geometry: Vec<LatLng>) -> Result<RegionRecord, RegionError> {
        let geometry = normalize_polygon(geometry)?;
        let center =
            bounding_box_center(&geometry).ok_or(RegionError::TooFewVertices { count: 0 })?;

        let mut inner = self.write();
        let now = chrono::Utc::now().timestamp_millis();
        let next = now.max(inner.last_id + 1);
        inner.last_id = next;

        let record = RegionRecord {
            id: RegionId::new(next.to_string()),
            geometry,
            center,
            metrics: RegionMetrics::default(),
            analyzed: false,
        };
        inner.records.push(record.clone());

        log::debug!(
            "Added region {} centered at ({}, {})",
            record.id,
            center.lat,
            center.lng
        );

        Ok(record)
    }

    /// Attaches metrics to the region with the given id.
    ///
    /// Metrics are attached at most once per region. A missing id is a
    /// no-op, so late responses arriving after a reset never resurrect a
    /// region.
    pub fn attach_metrics(&self, id: &RegionId, metrics: RegionMetrics) -> AttachOutcome {
        let mut inner = self.write();

        let Some(record) = inner.records.iter_mut().find(|r| &r.id == id) else {
            log::debug!("Ignoring metrics for region {id}: no longer present");
            return AttachOutcome::Missing;
        };

        if record.analyzed {
            log::debug!("Ignoring metrics for region {id}: already attached");
            return AttachOutcome::AlreadyAttached;
        }

        record.metrics = metrics;
        record.analyzed = true;
        AttachOutcome::Attached
    }

    /// Returns a snapshot of every region in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<RegionRecord> {
        self.read().records.clone()
    }

    /// Returns a clone of the region with the given id.
    #[must_use]
    pub fn get(&self, id: &RegionId) -> Option<RegionRecord> {
        self.read().records.iter().find(|r| &r.id == id).cloned()
    }

    /// Returns `true` if a region with the given id is present.
    #[must_use]
    pub fn contains(&self, id: &RegionId) -> bool {
        self.read().records.iter().any(|r| &r.id == id)
    }

    /// Removes a single region. Returns `true` if it was present.
    pub fn remove(&self, id: &RegionId) -> bool {
        let mut inner = self.write();
        let before = inner.records.len();
        inner.records.retain(|r| &r.id != id);
        inner.records.len() != before
    }

    /// Removes every region and returns how many were removed.
    pub fn remove_all(&self) -> usize {
        let mut inner = self.write();
        let removed = inner.records.len();
        inner.records.clear();
        log::info!("Cleared {removed} region(s)");
        removed
    }

    /// Number of regions currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().records.len()
    }

    /// Returns `true` if the store holds no regions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.read().records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<LatLng> {
        vec![
            LatLng::new(-3.0, -62.0),
            LatLng::new(-3.0, -60.0),
            LatLng::new(-5.0, -61.0),
        ]
    }

    fn metrics(biomass: f64) -> RegionMetrics {
        RegionMetrics {
            biomass_mean_mgc_ha: Some(biomass),
            ..RegionMetrics::default()
        }
    }

    #[test]
    fn add_assigns_increasing_ids_and_empty_metrics() {
        let store = RegionStore::new();
        let first = store.add(triangle()).unwrap();
        let second = store.add(triangle()).unwrap();

        let a: i64 = first.as_str().parse().unwrap();
        let b: i64 = second.as_str().parse().unwrap();
        assert!(b > a);

        let record = store.get(&first).unwrap();
        assert!(record.metrics.is_empty());
        assert!(!record.analyzed);
        assert!((record.center.lat - -4.0).abs() < 1e-9);
    }

    #[test]
    fn list_preserves_insertion_order() {
        let store = RegionStore::new();
        let ids: Vec<RegionId> = (0..3).map(|_| store.add(triangle()).unwrap()).collect();
        let listed: Vec<RegionId> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn attach_metrics_happens_once() {
        let store = RegionStore::new();
        let id = store.add(triangle()).unwrap();

        assert_eq!(store.attach_metrics(&id, metrics(1.0)), AttachOutcome::Attached);
        assert_eq!(
            store.attach_metrics(&id, metrics(2.0)),
            AttachOutcome::AlreadyAttached
        );
        assert_eq!(store.get(&id).unwrap().metrics, metrics(1.0));
    }

    #[test]
    fn attach_after_reset_is_a_noop() {
        let store = RegionStore::new();
        let id = store.add(triangle()).unwrap();
        assert_eq!(store.remove_all(), 1);

        assert_eq!(store.attach_metrics(&id, metrics(1.0)), AttachOutcome::Missing);
        assert!(store.is_empty());
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn remove_single_region() {
        let store = RegionStore::new();
        let keep = store.add(triangle()).unwrap();
        let gone = store.add(triangle()).unwrap();

        assert!(store.remove(&gone));
        assert!(!store.remove(&gone));
        assert_eq!(store.len(), 1);
        assert!(store.contains(&keep));
    }

    #[test]
    fn add_record_returns_normalized_geometry_that_outlives_a_reset() {
        let store = RegionStore::new();
        let mut ring = triangle();
        ring.push(ring[0]);

        let record = store.add_record(ring).unwrap();
        assert_eq!(store.remove_all(), 1);

        assert_eq!(record.geometry, triangle());
        assert!((record.center.lat - -4.0).abs() < 1e-9);
        assert!(store.get(&record.id).is_none());
    }

    #[test]
    fn invalid_polygon_is_not_stored() {
        let store = RegionStore::new();
        let result = store.add(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)]);
        assert_eq!(result, Err(RegionError::TooFewVertices { count: 2 }));
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_attach_keyed_by_id() {
        let store = RegionStore::new();
        let ids: Vec<RegionId> = (0..8).map(|_| store.add(triangle()).unwrap()).collect();

        std::thread::scope(|scope| {
            for (i, id) in ids.iter().enumerate() {
                let store = &store;
                #[allow(clippy::cast_precision_loss)]
                let value = i as f64;
                scope.spawn(move || store.attach_metrics(id, metrics(value)));
            }
        });

        for (i, record) in store.list().iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let expected = i as f64;
            assert_eq!(record.metrics.biomass_mean_mgc_ha, Some(expected));
        }
    }
}
