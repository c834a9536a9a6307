pub mod align;
pub mod deinterleave;
pub mod error;
pub mod io;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod signal;
pub mod window;

pub use align::*;
pub use deinterleave::*;
pub use error::{AnalysisError, Result};
pub use metrics::*;
pub use normalize::*;
pub use pipeline::*;
pub use signal::*;
pub use window::*;
