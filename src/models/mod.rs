//! Data models for RentKar

pub mod borrow_request;
pub mod enums;
pub mod item;
pub mod statistics;
pub mod user;

// Re-export commonly used types
pub use borrow_request::{BorrowRequest, CreateBorrowRequest, ResponsePayload};
pub use enums::{ItemStatus, RequestAction, RequestStatus, StatusFilter, ViewRole};
pub use item::{Item, ItemOwner, ItemQuery, Page, Pagination};
pub use statistics::RequestStatistics;
pub use user::{LoginRequest, LoginResponse, RegisterRequest, User};
