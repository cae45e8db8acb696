pub mod extraction;
pub mod integration;
pub mod mapping;
