#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod question;

pub use question::{Invalid, Question, RawQuestion};
