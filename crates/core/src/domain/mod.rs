pub mod activity;
pub mod product;
pub mod recommendation;
