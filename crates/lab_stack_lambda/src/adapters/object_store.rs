/// Result of a single listing call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectListing {
    /// Count reported by the store, which may differ from `keys.len()` when
    /// the store omits keys.
    pub key_count: usize,
    pub keys: Vec<String>,
}

pub trait ObjectLister {
    fn list_objects(&self, bucket: &str) -> Result<ObjectListing, String>;
}
