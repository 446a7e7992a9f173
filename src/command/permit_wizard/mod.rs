// src/command/permit_wizard/mod.rs

pub mod flow;
pub mod nav;
pub mod ops;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_support;

pub use flow::*;
pub use nav::*;
pub use ops::*;
pub use types::*;
pub use validate::*;
