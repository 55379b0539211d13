mod auth;
mod progress;

pub use auth::TokenManager;
pub use progress::ProgressStore;
pub use progress::TransferCheckpoint;
pub use progress::{MAX_SLUG_BYTES, checkpoint_key};
