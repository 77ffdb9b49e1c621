pub mod canon;
pub mod error;
pub mod fingerprint;
pub mod hash;
pub mod push;
pub mod vote;

pub use error::DriftError;
pub use fingerprint::*;
pub use push::*;
pub use vote::*;
