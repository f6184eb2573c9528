//! Services shared by every client

mod local_store;

pub use local_store::LocalStore;
