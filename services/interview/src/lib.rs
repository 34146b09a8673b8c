pub mod backend;
pub mod config;
pub mod controls;
#[cfg(feature = "native-audio")]
pub mod device;
pub mod microphone;
pub mod renderer;
