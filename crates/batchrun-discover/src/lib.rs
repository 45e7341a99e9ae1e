mod gpu;
pub use gpu::{allocate_slots, discover_resources, parse_free_memory};

mod config;
pub use config::DiscoverConfig;

mod errors;
pub use errors::DiscoverError;
