pub mod health;
pub mod strategy;
