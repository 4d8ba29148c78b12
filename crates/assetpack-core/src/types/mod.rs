//! Core bridge types.
//!
//! These types enforce their invariants at construction time,
//! ensuring invalid states are unrepresentable.

mod flavor;
mod pack_id;
mod service_url;
mod slug;

pub use flavor::Flavor;
pub use pack_id::PackId;
pub use service_url::ServiceUrl;
pub use slug::{SLUG_SEPARATOR, Slug};
