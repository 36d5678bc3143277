pub mod media_fetcher;
pub mod vision_info;

pub use media_fetcher::{MediaFetcher, MediaSource};
pub use vision_info::{ContentPartExtractor, ImageFetcher, VisionInfoExtractor};
