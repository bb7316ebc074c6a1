pub mod synthesize;
pub mod timecode;

pub use synthesize::{render_srt, synthesize};
