//! Page classification: a cascade of progressively weaker strategies.

pub mod cascade;
pub mod keywords;
pub mod model;

pub use cascade::{Cascade, Classification, UNCATEGORIZED};
pub use keywords::{KeywordTaxonomy, PREDEFINED_TAXONOMY};
pub use model::{CategoryModel, ModelVerdict, OpenAiModel};
