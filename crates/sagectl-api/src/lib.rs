pub mod http;
pub mod memory;
pub mod sigv4;
pub mod types;

pub use http::HttpControlPlane;
pub use memory::{Call, MemoryControlPlane};
pub use sigv4::Credentials;
pub use types::{ControlPlane, Operation};
