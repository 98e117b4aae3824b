pub mod attachment;
pub mod client;
pub mod engine;
pub mod mapper;
pub mod query;
pub mod remap;
pub mod table;
pub mod variable;

pub use crate::domain::model::{Diff, ModuleOutput, Record};
pub use crate::domain::ports::{Module, ModuleContext};
pub use crate::utils::error::Result;
