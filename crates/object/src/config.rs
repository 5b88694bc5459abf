//! Configuration options for the object model

/// Default bound on left-zero-padding of secret key values
pub const DEFAULT_MAX_SECRET_KEY_PADDING: usize = 200;

/// Configuration options for object construction and enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectConfig {
    /// Hide reader pseudo-objects from searches with an empty template
    pub hide_reader_objects: bool,

    /// Secret key values are only padded when they grow by fewer bytes than this
    pub max_secret_key_padding: usize,
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            hide_reader_objects: true,
            max_secret_key_padding: DEFAULT_MAX_SECRET_KEY_PADDING,
        }
    }
}

impl ObjectConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set whether empty templates hide reader pseudo-objects
    pub const fn with_hide_reader_objects(mut self, hide: bool) -> Self {
        self.hide_reader_objects = hide;
        self
    }

    /// Set the secret key padding bound
    pub const fn with_max_secret_key_padding(mut self, max: usize) -> Self {
        self.max_secret_key_padding = max;
        self
    }
}
