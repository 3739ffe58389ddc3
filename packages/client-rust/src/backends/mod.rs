//! [`BackingStore`](crate::BackingStore) implementations.
//!
//! [`MemoryBackend`] is always available; the AWS SDK adapter is compiled
//! in with the `aws` feature.

#[cfg(feature = "aws")]
mod aws;
mod memory;

#[cfg(feature = "aws")]
pub use aws::AwsBackend;
pub use memory::{MemoryBackend, Operation};
