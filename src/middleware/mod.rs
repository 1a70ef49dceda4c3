pub mod response;
pub mod user;

pub use response::{ApiResponse, ApiResult};
pub use user::CallerIdentity;
