//! Configuration access port trait.

use crate::domain::error::JournalError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Like [`get_string`](Self::get_string) but a missing key is an error.
    fn require_string(&self, section: &str, key: &str) -> Result<String, JournalError> {
        self.get_string(section, key)
            .ok_or_else(|| JournalError::ConfigMissing {
                section: section.into(),
                key: key.into(),
            })
    }
}
