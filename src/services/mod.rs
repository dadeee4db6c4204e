pub mod cancellation;
pub mod error;
pub mod refund;
