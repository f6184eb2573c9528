pub mod archive;
pub mod common;
pub mod delete;
pub mod entry;
pub mod status;
pub mod sync;
pub mod tome;
