pub mod config;
pub mod error;
pub mod ratings;
pub mod types;

pub use config::Config;
pub use error::HiddenSpotsError;
pub use ratings::{apply_rating, recompute, RatingInput, RatingUpdate};
pub use types::*;
