pub mod image_orderer;

pub use image_orderer::{DefaultImageOrderer, ExamplePairing, ImageOrderer};
