pub mod hoist;
pub mod mapping;
pub mod reorganize;
