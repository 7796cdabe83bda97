#![doc = include_str!("../README.md")]

mod bridge;
mod cache;
mod cancel;
mod error;
mod gateway;
mod manager;

pub use bridge::{RootContext, SolveBridge};
pub use cache::SourceCache;
pub use cancel::CancelToken;
pub use error::Error;
pub use gateway::{AnalyzerInfo, ManifestAnalyzer, SourceGateway};
pub use manager::SourceManager;
