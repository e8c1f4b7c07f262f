pub mod domain;
pub mod ident;
pub mod report;

pub use domain::*;
