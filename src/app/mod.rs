pub mod context;
pub mod controller;
pub mod error;

pub use context::AppContext;
pub use controller::FeedController;
pub use error::{FeedTipsError, Result};
