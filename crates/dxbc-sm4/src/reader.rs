use crate::error::ParseError;

/// Bounds-checked cursor over the 32-bit token stream of a shader-code chunk.
///
/// Tokens are little-endian on the wire and are normalized to host order
/// before the reader ever sees them (see [`tokens_from_bytes`]). The reader
/// tracks an end position that can be tightened once the program's declared
/// length is known; every read past it fails with [`ParseError::Truncated`].
pub struct TokenReader<'t> {
    tokens: &'t [u32],
    pos: usize,
    end: usize,
}

impl<'t> TokenReader<'t> {
    pub fn new(tokens: &'t [u32]) -> Self {
        Self {
            tokens,
            pos: 0,
            end: tokens.len(),
        }
    }

    /// Current position, in tokens from the start of the stream.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    /// Tokens left before the current end position.
    pub fn remaining(&self) -> usize {
        self.end.saturating_sub(self.pos)
    }

    /// Tightens the end position. Fails if the new end lies outside the
    /// underlying stream.
    pub fn set_end(&mut self, end: usize) -> Result<(), ParseError> {
        if end > self.tokens.len() {
            return Err(ParseError::Truncated {
                at_token: self.pos,
                wanted: end - self.tokens.len(),
            });
        }
        self.end = end;
        Ok(())
    }

    pub fn read_u32(&mut self) -> Result<u32, ParseError> {
        if self.pos >= self.end {
            return Err(ParseError::Truncated {
                at_token: self.pos,
                wanted: 1,
            });
        }
        let v = self.tokens[self.pos];
        self.pos += 1;
        Ok(v)
    }

    /// Reads two tokens as one 64-bit value, low word first.
    pub fn read_u64(&mut self) -> Result<u64, ParseError> {
        let lo = self.read_u32()? as u64;
        let hi = self.read_u32()? as u64;
        Ok(lo | (hi << 32))
    }

    /// Reads `n` tokens as a slice without copying.
    pub fn read_slice(&mut self, n: usize) -> Result<&'t [u32], ParseError> {
        if self.end - self.pos < n {
            return Err(ParseError::Truncated {
                at_token: self.pos,
                wanted: n - (self.end - self.pos),
            });
        }
        let out = &self.tokens[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Advances `n` tokens without reading them.
    pub fn skip(&mut self, n: usize) -> Result<(), ParseError> {
        if self.end - self.pos < n {
            return Err(ParseError::Truncated {
                at_token: self.pos,
                wanted: n - (self.end - self.pos),
            });
        }
        self.pos += n;
        Ok(())
    }
}

/// Normalizes a shader-code chunk payload into host-order tokens.
pub fn tokens_from_bytes(bytes: &[u8]) -> Result<Vec<u32>, ParseError> {
    if bytes.len() % 4 != 0 {
        return Err(ParseError::InvariantViolation {
            at_token: 0,
            context: "shader chunk length is not a multiple of 4",
        });
    }
    let mut tokens = Vec::with_capacity(bytes.len() / 4);
    for word in bytes.chunks_exact(4) {
        tokens.push(u32::from_le_bytes([word[0], word[1], word[2], word[3]]));
    }
    Ok(tokens)
}
