pub mod checkpoint;
pub mod config;
pub mod dynamics;
pub mod geometry;
pub mod membrane;
pub mod state;
