//! Request statistics for the current user

use serde::{Deserialize, Serialize};

use super::enums::{RequestStatus, StatusFilter, ViewRole};

/// Per-status counts plus per-role totals (`GET /requests/statistics`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RequestStatistics {
    pub pending_count: u32,
    pub approved_count: u32,
    pub rejected_count: u32,
    pub returned_count: u32,
    pub completed_count: u32,
    pub total_sent: u32,
    pub total_received: u32,
}

impl RequestStatistics {
    pub fn count_for(&self, status: RequestStatus) -> u32 {
        match status {
            RequestStatus::Pending => self.pending_count,
            RequestStatus::Approved => self.approved_count,
            RequestStatus::Rejected => self.rejected_count,
            RequestStatus::Returned => self.returned_count,
            RequestStatus::Completed => self.completed_count,
        }
    }

    pub fn count_mut(&mut self, status: RequestStatus) -> &mut u32 {
        match status {
            RequestStatus::Pending => &mut self.pending_count,
            RequestStatus::Approved => &mut self.approved_count,
            RequestStatus::Rejected => &mut self.rejected_count,
            RequestStatus::Returned => &mut self.returned_count,
            RequestStatus::Completed => &mut self.completed_count,
        }
    }

    pub fn total_for(&self, role: ViewRole) -> u32 {
        match role {
            ViewRole::Borrower => self.total_sent,
            ViewRole::Lender => self.total_received,
        }
    }

    pub fn total_mut(&mut self, role: ViewRole) -> &mut u32 {
        match role {
            ViewRole::Borrower => &mut self.total_sent,
            ViewRole::Lender => &mut self.total_received,
        }
    }

    /// Count displayed next to a filter option; ALL shows the role total
    pub fn count_for_filter(&self, filter: StatusFilter, role: ViewRole) -> u32 {
        match filter {
            StatusFilter::All => self.total_for(role),
            StatusFilter::Only(status) => self.count_for(status),
        }
    }
}
