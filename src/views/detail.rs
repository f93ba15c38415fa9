//! Full request view.
//!
//! The counterpart's email and phone are shown only once the request is
//! APPROVED. This is a display rule; the data is already on the client.

use std::fmt;

use super::card::counterpart_label;
use super::{format_date_long, format_date_time, ActionButton, StatusBadge};
use crate::models::{BorrowRequest, RequestAction, RequestStatus, ViewRole};
use crate::workflow::allowed_actions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactDetails {
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDetail {
    pub id: i64,
    pub item_title: String,
    pub item_description: Option<String>,
    pub item_category: Option<String>,
    pub badge: StatusBadge,
    pub counterpart_label: &'static str,
    pub counterpart_name: String,
    pub counterpart_username: String,
    pub contact: Option<ContactDetails>,
    pub borrow_date: String,
    pub return_date: String,
    pub duration_days: i64,
    pub request_message: Option<String>,
    pub response_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub returned_at: Option<String>,
    pub completed_at: Option<String>,
    pub actions: Vec<ActionButton>,
}

impl RequestDetail {
    pub fn new(request: &BorrowRequest, role: ViewRole, in_flight: Option<RequestAction>) -> Self {
        let counterpart = request.counterpart(role);
        let contact = (request.status == RequestStatus::Approved).then(|| ContactDetails {
            email: counterpart.email.clone(),
            phone: counterpart.phone.clone(),
        });

        Self {
            id: request.id,
            item_title: request.item.title.clone(),
            item_description: request.item.description.clone(),
            item_category: request.item.category.clone(),
            badge: StatusBadge::new(request.status),
            counterpart_label: counterpart_label(role),
            counterpart_name: counterpart.display_name().to_string(),
            counterpart_username: counterpart.username.clone(),
            contact,
            borrow_date: format_date_long(request.borrow_date),
            return_date: format_date_long(request.return_date),
            duration_days: request.duration_days(),
            request_message: request.request_message.clone(),
            response_message: request.response_message.clone(),
            created_at: format_date_time(request.created_at),
            updated_at: format_date_time(request.updated_at),
            returned_at: request.returned_at.map(format_date_time),
            completed_at: request.completed_at.map(format_date_time),
            actions: ActionButton::for_actions(allowed_actions(request.status, role), in_flight),
        }
    }
}

impl fmt::Display for RequestDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Request #{} {}", self.id, self.badge)?;
        writeln!(f)?;
        writeln!(f, "Item:        {}", self.item_title)?;
        if let Some(category) = &self.item_category {
            writeln!(f, "Category:    {}", category)?;
        }
        if let Some(description) = &self.item_description {
            writeln!(f, "Description: {}", description)?;
        }
        writeln!(
            f,
            "{:<13}{} (@{})",
            format!("{}:", self.counterpart_label),
            self.counterpart_name,
            self.counterpart_username
        )?;
        if let Some(contact) = &self.contact {
            writeln!(f, "Email:       {}", contact.email)?;
            if let Some(phone) = &contact.phone {
                writeln!(f, "Phone:       {}", phone)?;
            }
        }
        writeln!(
            f,
            "Period:      {} - {} ({} days)",
            self.borrow_date, self.return_date, self.duration_days
        )?;
        if let Some(message) = &self.request_message {
            writeln!(f, "Message:     {}", message)?;
        }
        if let Some(message) = &self.response_message {
            writeln!(f, "Response:    {}", message)?;
        }
        writeln!(f, "Requested:   {}", self.created_at)?;
        writeln!(f, "Updated:     {}", self.updated_at)?;
        if let Some(at) = &self.returned_at {
            writeln!(f, "Returned:    {}", at)?;
        }
        if let Some(at) = &self.completed_at {
            writeln!(f, "Completed:   {}", at)?;
        }
        if !self.actions.is_empty() {
            let labels: Vec<&str> = self.actions.iter().map(|b| b.label).collect();
            write!(f, "Actions:     {}", labels.join(", "))?;
        }
        Ok(())
    }
}
