pub mod image;
pub mod input;

pub use image::{FetchedImage, ImageRef, ImageSource, VisionInfo};
pub use input::{Batched, ExampleGroup, ExampleInput, MessageGroup, MessageInput};
