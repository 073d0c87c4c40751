pub mod measure;
pub mod product;
pub mod quote;
