//! Configuration access port trait.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    /// Section names in file order.
    fn sections(&self) -> Vec<String>;
}
