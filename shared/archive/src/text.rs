use crate::{ArchiveError, ArchiveRead, ArchiveWrite};

/// Whitespace-tokenized text archive writer. Intended for debugging captures
/// and wire-format inspection; the binary archive is the production default.
///
/// Numbers print through `Display` (shortest round-trip form for floats),
/// strings are double-quoted with `\"`, `\\` and `\n` escapes.
pub struct TextWriter {
    buffer: String,
}

impl TextWriter {
    pub fn new() -> Self {
        Self {
            buffer: String::with_capacity(256),
        }
    }

    pub fn to_bytes(self) -> Vec<u8> {
        self.buffer.into_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    fn push_token(&mut self, token: &str) {
        if !self.buffer.is_empty() {
            self.buffer.push(' ');
        }
        self.buffer.push_str(token);
    }
}

impl Default for TextWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveWrite for TextWriter {
    fn write_u8(&mut self, value: u8) {
        self.push_token(&value.to_string());
    }

    fn write_u16(&mut self, value: u16) {
        self.push_token(&value.to_string());
    }

    fn write_u32(&mut self, value: u32) {
        self.push_token(&value.to_string());
    }

    fn write_i16(&mut self, value: i16) {
        self.push_token(&value.to_string());
    }

    fn write_f32(&mut self, value: f32) {
        self.push_token(&value.to_string());
    }

    fn write_bool(&mut self, value: bool) {
        self.push_token(if value { "true" } else { "false" });
    }

    fn write_str(&mut self, value: &str) {
        let mut token = String::with_capacity(value.len() + 2);
        token.push('"');
        for ch in value.chars() {
            match ch {
                '"' => token.push_str("\\\""),
                '\\' => token.push_str("\\\\"),
                '\n' => token.push_str("\\n"),
                other => token.push(other),
            }
        }
        token.push('"');
        self.push_token(&token);
    }
}

/// Token-at-a-time reader over a text archive.
pub struct TextReader<'b> {
    text: &'b str,
    cursor: usize,
}

impl<'b> TextReader<'b> {
    pub fn new(bytes: &'b [u8]) -> Result<Self, ArchiveError> {
        let text = std::str::from_utf8(bytes).map_err(|_| ArchiveError::BadUtf8)?;
        Ok(Self { text, cursor: 0 })
    }

    fn skip_whitespace(&mut self) {
        let rest = &self.text[self.cursor..];
        let trimmed = rest.trim_start();
        self.cursor += rest.len() - trimmed.len();
    }

    fn next_token(&mut self) -> Result<&'b str, ArchiveError> {
        self.skip_whitespace();
        let rest = &self.text[self.cursor..];
        if rest.is_empty() {
            return Err(ArchiveError::ShortRead {
                wanted: 1,
                remaining: 0,
            });
        }
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        self.cursor += end;
        Ok(&rest[..end])
    }

    fn parse<T: std::str::FromStr>(&mut self, expected: &'static str) -> Result<T, ArchiveError> {
        let token = self.next_token()?;
        token.parse().map_err(|_| ArchiveError::BadToken {
            token: token.to_string(),
            expected,
        })
    }
}

impl ArchiveRead for TextReader<'_> {
    fn read_u8(&mut self) -> Result<u8, ArchiveError> {
        self.parse("u8")
    }

    fn read_u16(&mut self) -> Result<u16, ArchiveError> {
        self.parse("u16")
    }

    fn read_u32(&mut self) -> Result<u32, ArchiveError> {
        self.parse("u32")
    }

    fn read_i16(&mut self) -> Result<i16, ArchiveError> {
        self.parse("i16")
    }

    fn read_f32(&mut self) -> Result<f32, ArchiveError> {
        self.parse("f32")
    }

    fn read_bool(&mut self) -> Result<bool, ArchiveError> {
        self.parse("bool")
    }

    fn read_string(&mut self) -> Result<String, ArchiveError> {
        self.skip_whitespace();
        let rest = &self.text[self.cursor..];
        let mut chars = rest.char_indices();
        match chars.next() {
            Some((_, '"')) => {}
            Some(_) => {
                // Unquoted where a string belongs: report the stray token.
                let token = self.next_token()?;
                return Err(ArchiveError::BadToken {
                    token: token.to_string(),
                    expected: "quoted string",
                });
            }
            None => {
                return Err(ArchiveError::ShortRead {
                    wanted: 1,
                    remaining: 0,
                })
            }
        }

        let mut value = String::new();
        let mut escaped = false;
        for (index, ch) in chars {
            if escaped {
                match ch {
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'n' => value.push('\n'),
                    other => {
                        return Err(ArchiveError::BadToken {
                            token: format!("\\{other}"),
                            expected: "string escape",
                        })
                    }
                }
                escaped = false;
            } else {
                match ch {
                    '\\' => escaped = true,
                    '"' => {
                        self.cursor += index + 1;
                        return Ok(value);
                    }
                    other => value.push(other),
                }
            }
        }

        Err(ArchiveError::Malformed {
            what: "unterminated string",
        })
    }
}
