pub mod mcp;
pub mod services;
pub mod store;

/// Test utilities for unit and integration testing.
/// Only available with cfg(test) or feature "testing".
#[cfg(any(test, feature = "testing"))]
pub mod testing;
