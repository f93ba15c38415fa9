//! Status badge shown next to every request

use std::fmt;

use crate::models::RequestStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeTone {
    Warning,
    Success,
    Danger,
    Info,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusBadge {
    pub status: RequestStatus,
}

impl StatusBadge {
    pub fn new(status: RequestStatus) -> Self {
        Self { status }
    }

    pub fn label(&self) -> &'static str {
        match self.status {
            RequestStatus::Pending => "Pending",
            RequestStatus::Approved => "Approved",
            RequestStatus::Rejected => "Rejected",
            RequestStatus::Returned => "Returned",
            RequestStatus::Completed => "Completed",
        }
    }

    pub fn tone(&self) -> BadgeTone {
        match self.status {
            RequestStatus::Pending => BadgeTone::Warning,
            RequestStatus::Approved => BadgeTone::Success,
            RequestStatus::Rejected => BadgeTone::Danger,
            RequestStatus::Returned => BadgeTone::Info,
            RequestStatus::Completed => BadgeTone::Neutral,
        }
    }
}

impl fmt::Display for StatusBadge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.label())
    }
}
