pub mod govee;
pub mod nhl;

// Re-export commonly used types
pub use govee::{GoveeClient, GOVEE_API_BASE};
pub use nhl::{NhlClient, Scoreboard, NHL_API_BASE};
