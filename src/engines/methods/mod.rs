pub mod base;
pub mod prediction;

pub use base::{
    CancellationToken, CandidateReport, LookaheadReport, SplitFailure, SplitOutcome, SplitScore,
};
pub use prediction::{CandidateRun, LookaheadRun, PredictionRunner};
