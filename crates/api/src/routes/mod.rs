pub mod health;
pub mod separation;
