mod client_identity_extractor;

pub use client_identity_extractor::*;
