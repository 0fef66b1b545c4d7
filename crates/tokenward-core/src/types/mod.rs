//! Core type definitions shared by the tokenward crates.

pub mod token_type;

pub use token_type::TokenType;
