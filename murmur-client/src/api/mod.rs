mod client;
mod error;
mod traits;

pub use client::ApiClient;
pub use error::{ApiError, ApiResult};
pub use traits::{Backend, IdentityProvider, Navigator, ObjectStorage, Screen};
