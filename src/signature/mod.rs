//! Request-signing schemes used to authenticate against vendor APIs.
//!
//! Both schemes are pure functions of their inputs: identical requests, secrets and timestamps
//! always produce identical signatures.

mod query;
mod tc3;

pub use query::{canonical_query, percent_encode, sign_query, string_to_sign};
pub use tc3::{CanonicalRequest, Tc3Signer};
