use crate::error::MutualAidError;
use crate::types::{Profile, UserId};

pub trait ProfileRepository {
    fn create(&self, id: &UserId, display_name: &str) -> Result<Profile, MutualAidError>;
    fn get(&self, id: &UserId) -> Result<Option<Profile>, MutualAidError>;
}
