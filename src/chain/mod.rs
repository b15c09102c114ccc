pub mod organization;
pub mod transaction;
