//! Tunables of the feature adapter.

/// Default chunk size of the send-file copy loop.
pub const DEFAULT_SEND_FILE_CHUNK_SIZE: usize = 64 * 1024;

/// Default initial capacity of the in-memory response buffer.
pub const DEFAULT_RESPONSE_BUFFER_CAPACITY: usize = 4 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureOptions {
    send_file_chunk_size: usize,
    response_buffer_capacity: usize,
}

impl FeatureOptions {
    pub fn builder() -> FeatureOptionsBuilder {
        FeatureOptionsBuilder::new()
    }

    pub fn send_file_chunk_size(&self) -> usize {
        self.send_file_chunk_size
    }

    pub fn response_buffer_capacity(&self) -> usize {
        self.response_buffer_capacity
    }
}

impl Default for FeatureOptions {
    fn default() -> Self {
        Self { send_file_chunk_size: DEFAULT_SEND_FILE_CHUNK_SIZE, response_buffer_capacity: DEFAULT_RESPONSE_BUFFER_CAPACITY }
    }
}

#[derive(Debug)]
pub struct FeatureOptionsBuilder {
    inner: FeatureOptions,
}

impl FeatureOptionsBuilder {
    fn new() -> Self {
        Self { inner: FeatureOptions::default() }
    }

    /// Sets the send-file chunk size; zero is raised to one byte.
    pub fn send_file_chunk_size(mut self, size: usize) -> Self {
        self.inner.send_file_chunk_size = size.max(1);
        self
    }

    pub fn response_buffer_capacity(mut self, capacity: usize) -> Self {
        self.inner.response_buffer_capacity = capacity;
        self
    }

    pub fn build(self) -> FeatureOptions {
        self.inner
    }
}
