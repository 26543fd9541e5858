//! Key Module
//!
//! Derives storage keys from call signatures and builds the patterns used
//! to find them again for invalidation.

mod call;
pub mod codec;
pub mod glob;
mod pattern;


// Re-export public types
pub use call::Call;
pub use codec::{build_key, CacheKey};
pub use pattern::{InvalidationPattern, ParamMapping};
