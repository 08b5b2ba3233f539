pub mod auth;
pub mod team;
pub mod ingredients;
pub mod stock;
pub mod students;
pub mod attendances;
pub mod menu;
pub mod reports;
