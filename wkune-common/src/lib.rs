//! # WKUNE Common Library
//!
//! Shared code for the WKUNE session coordinator including:
//! - Session and member records plus the `Store` persistence trait
//! - Event types (SessionEvent enum) and the EventBus
//! - Item normalization used for duplicate detection
//! - Configuration loading
//! - Time and identifier helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod normalize;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use normalize::{dedup_items, is_duplicate_item, items_equal, normalize_item};
