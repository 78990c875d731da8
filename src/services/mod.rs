/// Business logic services layer
pub mod analysis;
pub mod capture;

pub use analysis::AnalysisService;
pub use capture::{placeholder_jpeg, CaptureService};
