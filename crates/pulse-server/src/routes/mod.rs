pub mod actions;
pub mod billing;
pub mod dashboard;
pub mod emergency;
pub mod health;
pub mod pulse;
pub mod team;
