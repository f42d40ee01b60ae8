pub mod models;
pub mod separation;
