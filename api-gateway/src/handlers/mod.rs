pub mod health;
pub mod nodes;
pub mod users;
