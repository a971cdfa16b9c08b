pub mod conversations;
pub mod error;
pub mod help_requests;
pub mod lifecycle;
pub mod messages;
pub mod notify;
pub mod policy;
pub mod profiles;
pub mod store;
pub mod validation;

pub mod types;

pub use crate::error::{ErrorKind, MutualAidError};
pub use crate::lifecycle::{Lifecycle, RequestContext};
pub use crate::notify::Notifier;
pub use crate::policy::AccessPolicy;
pub use crate::store::Store;
