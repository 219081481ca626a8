pub mod backend;
pub mod registry;
pub mod tier;
