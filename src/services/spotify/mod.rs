pub mod client;

pub use client::SpotifyCatalog;
