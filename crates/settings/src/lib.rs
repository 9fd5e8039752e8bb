//! Store-wide settings: one singleton document holding pricing rules,
//! invoicing terms and the document number counters.

pub mod store;

pub use store::{SettingsPatch, StoreSettings, format_number};
