pub mod input;
pub mod preroll;
pub mod segment;
pub mod vad;
pub mod wav;

pub use input::{AudioInput, AudioInputConfig, CpalInput, CpalInputFactory, InputFactory};
pub use preroll::PreRollBuffer;
pub use segment::SegmentAccumulator;
