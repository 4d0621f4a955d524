//! Wire and domain types shared by the feedback clients.

pub mod domain;
pub mod error;
pub mod protocol;
