mod claims;
mod extractors;
mod keys;

pub use claims::{Claims, Role};
pub use extractors::Session;
pub use keys::JwtKeys;

#[cfg(test)]
pub(crate) use keys::test_tokens::token_for;
