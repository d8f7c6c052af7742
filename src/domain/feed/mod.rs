pub mod model;

pub use model::{Comment, Feed, Item, ItemDetails, MediaInfo, Source};
