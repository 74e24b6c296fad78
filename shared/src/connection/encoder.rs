cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use zstd::bulk::Compressor;

        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        /// Whole-payload compressor for outgoing envelopes.
        pub struct Encoder {
            result: Vec<u8>,
            compressor: Compressor<'static>,
        }

        impl Encoder {
            pub fn try_new(mode: CompressionMode) -> Result<Self, EncoderError> {
                let compressor = match mode {
                    CompressionMode::Default(level) => Compressor::new(level)
                        .map_err(|_| EncoderError::CompressorCreationFailed { level })?,
                    CompressionMode::Dictionary(level, dictionary) => {
                        Compressor::with_dictionary(level, &dictionary)
                            .map_err(|_| EncoderError::CompressorWithDictionaryFailed { level })?
                    }
                };

                Ok(Self {
                    result: Vec::new(),
                    compressor,
                })
            }

            pub fn encode(&mut self, payload: &[u8]) -> Result<&[u8], EncoderError> {
                self.result = self
                    .compressor
                    .compress(payload)
                    .map_err(|_| EncoderError::CompressionFailed {
                        payload_size: payload.len(),
                    })?;
                Ok(&self.result)
            }

            /// Whether this encoder actually transforms payloads. The
            /// envelope codec only sets its compressed flag when it does.
            pub fn is_active(&self) -> bool {
                true
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::EncoderError;

        /// Passthrough stand-in when the `zstd_support` feature is off.
        pub struct Encoder {
            result: Vec<u8>,
        }

        impl Encoder {
            pub fn try_new(_: CompressionMode) -> Result<Self, EncoderError> {
                Ok(Self { result: Vec::new() })
            }

            pub fn encode(&mut self, payload: &[u8]) -> Result<&[u8], EncoderError> {
                self.result = payload.to_vec();
                Ok(&self.result)
            }

            pub fn is_active(&self) -> bool {
                false
            }
        }
    }
}
