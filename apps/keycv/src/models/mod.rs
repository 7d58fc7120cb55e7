pub mod analysis;
pub mod records;
pub mod user;
