pub mod commands;
pub mod input;
pub mod review;
pub mod session;
