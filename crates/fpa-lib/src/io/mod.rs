pub mod recording;
pub mod results;
pub mod text;
