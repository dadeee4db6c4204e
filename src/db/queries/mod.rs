pub mod cancellation;
pub mod ledger;
pub mod notification;
pub mod submission;
pub mod user;
