//! Telemetry sources for the fleet engine

pub mod demo;
pub mod http;
pub mod push;

pub use demo::DemoSource;
pub use http::HttpSource;
pub use push::{PushHandle, PushReceipt, PushSource};
