use super::layout::{GridLayout, grid_dimension};
use crate::domain::ShtResult;
use crate::numerics::{fill_legendre_table, legendre_table_len};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutTableKey {
    pub bandwidth: usize,
    pub dimension: usize,
    /// [`GridLayout::cache_id`] of the layout the tables were built for.
    pub layout: &'static str,
}

impl LayoutTableKey {
    pub const fn new(bandwidth: usize, layout: &'static str) -> Self {
        Self {
            bandwidth,
            dimension: grid_dimension(bandwidth),
            layout,
        }
    }

    pub fn for_layout(bandwidth: usize, layout: &dyn GridLayout) -> Self {
        Self::new(bandwidth, layout.cache_id())
    }
}

/// Precomputed per-layout data for one bandwidth.
///
/// `ring_legendre` holds one orthonormal Legendre table per latitude ring
/// (north hemisphere); the south hemisphere is recovered from the
/// `(-1)^(l+m)` parity, so no second table is stored.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTables {
    key: LayoutTableKey,
    table_len: usize,
    ring_legendre: Vec<f64>,
    cell_rings: Vec<usize>,
    cell_azimuths: Vec<f64>,
}

impl LayoutTables {
    pub fn build(bandwidth: usize, layout: &dyn GridLayout) -> ShtResult<Self> {
        let key = LayoutTableKey::for_layout(bandwidth, layout);
        let dimension = key.dimension;
        let cosines = layout.ring_cosines(dimension)?;
        let table_len = legendre_table_len(bandwidth);

        let mut ring_legendre = vec![0.0; cosines.len() * table_len];
        for (table, &cosine) in ring_legendre.chunks_mut(table_len).zip(&cosines) {
            fill_legendre_table(bandwidth, cosine, table);
        }

        let mut cell_rings = Vec::with_capacity(dimension * dimension);
        let mut cell_azimuths = Vec::with_capacity(dimension * dimension);
        for row in 0..dimension {
            for col in 0..dimension {
                cell_rings.push(layout.ring_index(row, col, dimension));
                cell_azimuths.push(layout.azimuth(row, col, dimension));
            }
        }

        Ok(Self {
            key,
            table_len,
            ring_legendre,
            cell_rings,
            cell_azimuths,
        })
    }

    pub fn key(&self) -> LayoutTableKey {
        self.key
    }

    pub fn bandwidth(&self) -> usize {
        self.key.bandwidth
    }

    pub fn dimension(&self) -> usize {
        self.key.dimension
    }

    pub fn ring_count(&self) -> usize {
        self.ring_legendre.len() / self.table_len
    }

    pub fn ring_legendre(&self, ring: usize) -> &[f64] {
        let start = ring * self.table_len;
        &self.ring_legendre[start..start + self.table_len]
    }

    /// Ring index and azimuth of a cell.
    pub fn cell(&self, row: usize, col: usize) -> (usize, f64) {
        let index = row * self.key.dimension + col;
        (self.cell_rings[index], self.cell_azimuths[index])
    }
}

type TableSlot = Arc<OnceLock<ShtResult<Arc<LayoutTables>>>>;

/// Layout tables keyed by (bandwidth, dimension, layout kind).
///
/// Each key is built at most once: callers racing on a missing key share one
/// `OnceLock` slot and all but one block until it is filled. Populated keys
/// are served under the read lock only.
#[derive(Debug, Default)]
pub struct LayoutTableCache {
    slots: RwLock<HashMap<LayoutTableKey, TableSlot>>,
    builds: AtomicUsize,
}

impl LayoutTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tables(
        &self,
        bandwidth: usize,
        layout: &dyn GridLayout,
    ) -> ShtResult<Arc<LayoutTables>> {
        let key = LayoutTableKey::for_layout(bandwidth, layout);
        let slot = self.slot(key);
        slot.get_or_init(|| {
            self.builds.fetch_add(1, Ordering::Relaxed);
            debug!(
                bandwidth,
                dimension = key.dimension,
                layout = key.layout,
                "building layout tables"
            );
            LayoutTables::build(bandwidth, layout).map(Arc::new)
        })
        .clone()
    }

    /// Number of table constructions performed so far.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn slot(&self, key: LayoutTableKey) -> TableSlot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Arc::clone(slot);
        }

        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(slots.entry(key).or_default())
    }
}
