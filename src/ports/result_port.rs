//! Result record persistence port trait.

use crate::domain::error::BackscanError;
use crate::domain::record::ResultRecord;

pub trait ResultPort {
    fn save(&self, records: &[ResultRecord]) -> Result<(), BackscanError>;
    fn load(&self) -> Result<Vec<ResultRecord>, BackscanError>;
}
