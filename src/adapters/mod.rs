pub mod frames;
pub mod http;

pub use frames::LocalFrameSource;
