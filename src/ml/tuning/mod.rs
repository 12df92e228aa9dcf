pub mod results;

pub use results::{ParamCandidate, TuningResults};
