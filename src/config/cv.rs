use super::traits::ConfigSection;
use crate::engines::splitters::CvConfig;
use crate::error::Result;

impl ConfigSection for CvConfig {
    fn section_name() -> &'static str {
        "cv"
    }

    fn validate(&self) -> Result<()> {
        self.check()
    }
}
