//! API endpoint handlers for the catalog service.

pub mod tracks;
