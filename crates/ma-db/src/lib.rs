pub mod conversation_repo;
pub mod help_request_repo;
pub mod message_repo;
pub mod profile_repo;
pub mod schema;
pub mod store;
pub mod util;

pub use crate::store::DbStore;
