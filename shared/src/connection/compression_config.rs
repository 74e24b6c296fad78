/// Configuration for stream-level payload compression.
#[derive(Clone)]
pub struct CompressionConfig {
    /// Compression applied to payloads the server sends to clients.
    pub server_to_client: Option<CompressionMode>,
    /// Compression applied to payloads clients send to the server.
    pub client_to_server: Option<CompressionMode>,
}

impl CompressionConfig {
    pub fn new(
        server_to_client: Option<CompressionMode>,
        client_to_server: Option<CompressionMode>,
    ) -> Self {
        Self {
            server_to_client,
            client_to_server,
        }
    }
}

#[derive(Clone)]
pub enum CompressionMode {
    /// Compress with the given zstd level using no dictionary.
    Default(i32),
    /// Compress with the given zstd level and a pre-trained dictionary.
    Dictionary(i32, Vec<u8>),
}
