pub mod org;
pub mod slot;
