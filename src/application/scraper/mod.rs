pub mod extractor;
pub mod fetcher;
pub mod service;
pub mod transforms;
