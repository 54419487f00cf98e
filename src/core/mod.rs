pub mod animation;
pub mod config;
pub mod constants;
pub mod geo;
pub mod map;
pub mod mapping;
pub mod projection;
pub mod viewport;
