pub mod contract_history;
pub mod contracts;
pub mod files;
pub mod organizations;
pub mod proposers;
pub mod tokens;
