//! HTTP API surface.
//!
//! - [`shop`] — buyer-facing checkout and order endpoints.
//! - [`admin`] — back-office endpoints behind the admin secret.
//! - [`extractors`] — authentication extractors shared by both.

pub mod admin;
pub mod extractors;
pub mod shop;

/// Default page size for list endpoints.
pub const DEFAULT_PAGE_SIZE: i64 = 50;
/// Hard cap on page size.
pub const MAX_PAGE_SIZE: i64 = 200;

/// Clamp client-supplied pagination to sane bounds.
pub fn clamp_pagination(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);
    (limit, offset)
}
