pub mod token_bucket;
pub use token_bucket::{Admission, RateLimiter, TokenBucket};
