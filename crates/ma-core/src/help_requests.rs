use crate::error::MutualAidError;
use crate::types::{HelpRequest, HelpRequestId, HelpRequestStatus, NewHelpRequest, UserId};
use chrono::{DateTime, Utc};

pub trait HelpRequestRepository {
    fn create(&self, input: NewHelpRequest) -> Result<HelpRequest, MutualAidError>;
    fn get(&self, id: &HelpRequestId) -> Result<Option<HelpRequest>, MutualAidError>;
    /// `open -> in_progress`; a no-op for any other status.
    fn mark_in_progress(&self, id: &HelpRequestId) -> Result<(), MutualAidError>;
    /// Sets the helper if none is assigned and the request is still active.
    /// Returns `None` when either condition no longer holds.
    fn assign_helper(
        &self,
        id: &HelpRequestId,
        helper_id: &UserId,
    ) -> Result<Option<HelpRequest>, MutualAidError>;
    /// Moves an active request to a terminal status, stamping the matching
    /// timestamp. Returns `None` when the request was already terminal.
    fn finish(
        &self,
        id: &HelpRequestId,
        to: HelpRequestStatus,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> Result<Option<HelpRequest>, MutualAidError>;
}
