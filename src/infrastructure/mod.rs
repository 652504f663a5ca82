pub mod media;
pub mod notify;
pub mod observability;
pub mod persistence;
pub mod storage;
