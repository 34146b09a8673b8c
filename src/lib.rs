mod client;

pub use interview_api_types as types;
pub use client::config::{Config, ConfigBuilder};
pub use client::stats::Stats;
pub use client::{connect, connect_with_config, Client};

#[cfg(feature = "utils")]
pub use interview_utils as utils;
