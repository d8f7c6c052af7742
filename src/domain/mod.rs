pub mod enrichment;
pub mod feed;
pub mod notify;
pub mod observed;
pub mod poll;
pub mod retry;
