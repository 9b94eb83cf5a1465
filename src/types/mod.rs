pub mod currency;
pub mod fire;
pub mod savings_entry;
