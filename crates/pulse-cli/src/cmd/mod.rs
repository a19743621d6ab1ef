pub mod config;
pub mod member;
pub mod score;
pub mod serve;
pub mod week;
pub mod workspace;
