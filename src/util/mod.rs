pub mod organization;
pub mod threshold;
