//! Offer to download the region the device is in.

use serde::{Deserialize, Serialize};

use mapfetch_core::{
    BootstrapPhase, CatalogNode, Locator, NodeId, StorageError, StorageResult, TransferEngine,
};

use super::{EnqueueOutcome, LOG_TARGET, Orchestrator};

/// What the user answered to the location offer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferDecision {
    #[default]
    Undecided,
    Accepted,
    Declined,
}

#[derive(Debug, Default)]
pub(super) struct LocationOffer {
    location: Option<NodeId>,
    decision: OfferDecision,
}

/// Resolves coordinates through the engine's own lookup.
struct EngineLocator<'a>(&'a dyn TransferEngine);

impl Locator for EngineLocator<'_> {
    fn locate(&self, lat: f64, lon: f64) -> Option<NodeId> {
        self.0.find_leaf_by_location(lat, lon)
    }
}

impl Orchestrator {
    /// Record the device position. Returns the leaf it falls in.
    ///
    /// A position outside every leaf keeps the previous one.
    pub fn set_location(&mut self, lat: f64, lon: f64) -> Option<NodeId> {
        let locator = EngineLocator(self.engine.as_ref());
        let found = self.catalog.find_by_location(lat, lon, &locator);
        match &found {
            Some(id) => {
                tracing::debug!(target: LOG_TARGET, id = %id, "Location resolved");
                self.offer.location = Some(id.clone());
            }
            None => tracing::debug!(target: LOG_TARGET, lat, lon, "Location outside catalog"),
        }
        found
    }

    /// The region to offer, if any.
    ///
    /// Offered only after bootstrap completed, for a known location whose
    /// leaf is neither on disk nor already pending, and only until the user
    /// answers.
    pub fn offer_location_based_download(&self) -> Option<CatalogNode> {
        if self.bootstrap.phase != BootstrapPhase::Complete
            || self.offer.decision != OfferDecision::Undecided
        {
            return None;
        }
        let id = self.offer.location.as_ref()?;
        let status = self.store.status_of(id);
        if status.is_on_disk() || status.is_pending() {
            return None;
        }
        self.catalog.get(id).cloned()
    }

    /// Accept the current offer and queue its region.
    pub fn accept_offer(&mut self) -> StorageResult<EnqueueOutcome> {
        let node = self
            .offer_location_based_download()
            .ok_or(StorageError::NoOffer)?;
        self.offer.decision = OfferDecision::Accepted;
        tracing::info!(target: LOG_TARGET, id = %node.id, "Location offer accepted");
        self.enqueue_download(&node.id)
    }

    /// Decline the current offer; it is not made again.
    pub fn decline_offer(&mut self) -> StorageResult<()> {
        let node = self
            .offer_location_based_download()
            .ok_or(StorageError::NoOffer)?;
        self.offer.decision = OfferDecision::Declined;
        tracing::info!(target: LOG_TARGET, id = %node.id, "Location offer declined");
        Ok(())
    }

    pub const fn offer_decision(&self) -> OfferDecision {
        self.offer.decision
    }
}
