pub mod direction;
pub mod formatter;
pub mod navigation;
pub mod scan;
pub mod speech;

pub use direction::{DirectionBucket, DirectionCue};
pub use formatter::{Banner, BannerKind};
pub use navigation::NavGuidance;
pub use scan::{LocateOutcome, ScanMode, ScanSession, ScanState, ScanTimings};
pub use speech::{SpeechPacing, SpeechQueue};
