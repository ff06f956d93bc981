use std::collections::HashSet;

use serde::Serialize;
use tracing::info;

use super::lifecycle::{BookingManager, required_admin_notes};
use crate::error::{Error, Result};
use crate::types::{Capability, CurrentUser};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BulkApproveOutcome {
    pub approved_count: usize,
    /// Bookings left pending because their slot was already approved.
    pub conflict_count: usize,
    /// Ids that were unknown or no longer pending.
    pub skipped_count: usize,
}

/// Applies approve or reject to a batch of bookings.
///
/// Approvals run one booking at a time, oldest request first, so each re-checks
/// its own slot. When two bookings in a batch target the same slot, the one
/// created first wins regardless of how the ids were listed.
#[derive(Clone)]
pub struct BulkCoordinator {
    bookings: BookingManager,
}

impl BulkCoordinator {
    pub fn new(bookings: BookingManager) -> Self {
        Self { bookings }
    }

    pub fn bulk_approve(
        &self,
        caller: &CurrentUser,
        booking_ids: &[String],
    ) -> Result<BulkApproveOutcome> {
        caller.require(Capability::REVIEW_BOOKINGS)?;
        let ids: Vec<String> = dedup_ids(booking_ids)?.into_iter().cloned().collect();
        let pending = self.bookings.store().list_pending_bookings(&ids)?;

        let mut outcome = BulkApproveOutcome {
            skipped_count: ids.len() - pending.len(),
            ..Default::default()
        };
        for booking in &pending {
            match self.bookings.approve_pending(&booking.id, None) {
                Ok(()) => outcome.approved_count += 1,
                Err(Error::SlotConflict) => outcome.conflict_count += 1,
                // Decided or deleted by another reviewer since it was loaded.
                Err(Error::NotFound | Error::InvalidState(_)) => outcome.skipped_count += 1,
                Err(e) => return Err(e),
            }
        }

        info!(
            approved = outcome.approved_count,
            conflicts = outcome.conflict_count,
            skipped = outcome.skipped_count,
            "Bulk approve finished"
        );
        Ok(outcome)
    }

    /// Rejects every listed booking that is still pending. Returns how many changed.
    pub fn bulk_reject(
        &self,
        caller: &CurrentUser,
        booking_ids: &[String],
        admin_notes: Option<String>,
    ) -> Result<usize> {
        caller.require(Capability::REVIEW_BOOKINGS)?;
        let admin_notes = required_admin_notes(admin_notes)?;
        let ids: Vec<String> = dedup_ids(booking_ids)?.into_iter().cloned().collect();

        let now = self.bookings.clock().now();
        let rejected = self
            .bookings
            .store()
            .reject_pending_bookings(&ids, &admin_notes, now)?;

        info!(requested = ids.len(), rejected, "Bulk reject finished");
        Ok(rejected)
    }
}

/// Keeps the first occurrence of each id, in request order.
fn dedup_ids(ids: &[String]) -> Result<Vec<&String>> {
    if ids.is_empty() {
        return Err(Error::validation("booking_ids must not be empty"));
    }
    let mut seen = HashSet::new();
    Ok(ids.iter().filter(|id| seen.insert(id.as_str())).collect())
}
