cfg_if! {
    if #[cfg(feature = "zstd_support")]
    {
        use zstd::bulk::Decompressor;

        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        /// Whole-payload decompressor for incoming envelopes.
        pub struct Decoder {
            result: Vec<u8>,
            decompressor: Decompressor<'static>,
        }

        impl Decoder {
            pub fn try_new(mode: CompressionMode) -> Result<Self, DecoderError> {
                let decompressor = match mode {
                    CompressionMode::Default(_) => Decompressor::new()
                        .map_err(|_| DecoderError::DecompressorCreationFailed)?,
                    CompressionMode::Dictionary(_, dictionary) => {
                        Decompressor::with_dictionary(&dictionary)
                            .map_err(|_| DecoderError::DecompressorWithDictionaryFailed)?
                    }
                };

                Ok(Self {
                    result: Vec::new(),
                    decompressor,
                })
            }

            /// Decompresses a payload. Processes untrusted network data:
            /// any malformed input comes back as an error, never a panic.
            pub fn decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                let upper_bound = Decompressor::<'static>::upper_bound(payload).map_err(|_| {
                    DecoderError::UpperBoundCalculationFailed {
                        payload_size: payload.len(),
                    }
                })?;

                self.result = self
                    .decompressor
                    .decompress(payload, upper_bound)
                    .map_err(|_| DecoderError::DecompressionFailed {
                        payload_size: payload.len(),
                    })?;
                Ok(&self.result)
            }

            pub fn is_active(&self) -> bool {
                true
            }
        }
    }
    else
    {
        use super::compression_config::CompressionMode;
        use super::error::DecoderError;

        /// Passthrough stand-in when the `zstd_support` feature is off.
        pub struct Decoder {
            result: Vec<u8>,
        }

        impl Decoder {
            pub fn try_new(_: CompressionMode) -> Result<Self, DecoderError> {
                Ok(Self { result: Vec::new() })
            }

            pub fn decode(&mut self, payload: &[u8]) -> Result<&[u8], DecoderError> {
                self.result = payload.to_vec();
                Ok(&self.result)
            }

            pub fn is_active(&self) -> bool {
                false
            }
        }
    }
}
