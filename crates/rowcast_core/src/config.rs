//! Serializer configuration.

/// What an update record carries besides the primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateMode {
    /// Every selected column, taken from the after image.
    #[default]
    FullAfter,
    /// Only selected columns whose payload changed between before and after.
    ChangedOnly,
}

/// What the primary-key entries of a delete record hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteKeys {
    /// NULL markers.
    #[default]
    Null,
    /// The converted key values of the deleted row.
    Values,
}

/// Configuration for a [`RecordSerializer`](crate::RecordSerializer).
#[derive(Debug, Clone)]
pub struct SerializerConfig {
    /// Convert tiny-integer columns declared `BOOLEAN` to booleans.
    pub tiny_int_as_bool: bool,

    /// Update record contents.
    pub update_mode: UpdateMode,

    /// Delete record key contents.
    pub delete_keys: DeleteKeys,

    /// Silently skip calls whose schema or table selection is not included.
    pub skip_excluded: bool,

    /// Offset of the source session time zone, in seconds east of UTC.
    /// `TIMESTAMP` values are read in this zone.
    pub source_utc_offset: i32,
}

impl Default for SerializerConfig {
    fn default() -> Self {
        Self {
            tiny_int_as_bool: true,
            update_mode: UpdateMode::FullAfter,
            delete_keys: DeleteKeys::Null,
            skip_excluded: false,
            source_utc_offset: 0,
        }
    }
}

impl SerializerConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether tiny integers declared `BOOLEAN` become booleans.
    #[must_use]
    pub const fn tiny_int_as_bool(mut self, value: bool) -> Self {
        self.tiny_int_as_bool = value;
        self
    }

    /// Sets the update record contents.
    #[must_use]
    pub const fn update_mode(mut self, mode: UpdateMode) -> Self {
        self.update_mode = mode;
        self
    }

    /// Sets the delete record key contents.
    #[must_use]
    pub const fn delete_keys(mut self, keys: DeleteKeys) -> Self {
        self.delete_keys = keys;
        self
    }

    /// Sets whether excluded schemas and tables are skipped.
    #[must_use]
    pub const fn skip_excluded(mut self, value: bool) -> Self {
        self.skip_excluded = value;
        self
    }

    /// Sets the source session offset in seconds east of UTC.
    #[must_use]
    pub const fn source_utc_offset(mut self, seconds: i32) -> Self {
        self.source_utc_offset = seconds;
        self
    }
}
