pub mod config;
pub mod cooperate;
pub mod permissions;
pub mod screen;
pub mod utils;
