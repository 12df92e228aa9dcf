pub mod ic;

pub use ic::InformationCoefficient;
