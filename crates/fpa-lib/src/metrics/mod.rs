pub mod baseline;
pub mod event;

pub use baseline::{pooled_mean, pooled_std};
pub use event::{area_under_curve, peak_z_score, z_scores, PeakZScore, RaggedPolicy};
