pub mod auth;
pub mod dashboard;
pub mod loans;
pub mod setup;
pub mod ui;
