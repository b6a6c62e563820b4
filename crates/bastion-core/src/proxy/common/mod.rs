// Shared proxy building blocks.

pub mod circuit_breaker;
pub mod header_constants;
