pub mod choropleth;
pub mod domain;
pub mod error;
