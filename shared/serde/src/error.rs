use thiserror::Error;

/// Errors raised while decoding a bit stream
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SerdeErr {
    /// Attempted to read past the end of the buffer
    #[error("Attempted to read past the end of the buffer ({bits_read} bits read of {bits_total})")]
    UnexpectedEnd {
        bits_read: usize,
        bits_total: usize,
    },

    /// A declared length is larger than what the buffer could possibly hold (SECURITY: potentially malicious input)
    #[error("Declared length {declared} exceeds the {remaining} bytes remaining in the buffer")]
    LengthOverflow {
        declared: u64,
        remaining: usize,
    },

    /// A variable-length integer did not terminate within 128 bits
    #[error("Variable-length integer exceeds 128 bits")]
    IntegerOverflow,

    /// Decoded integer does not fit in its target type
    #[error("Decoded value {value} does not fit in {target}")]
    IntegerOutOfRange {
        value: i128,
        target: &'static str,
    },

    /// Discriminant does not name any variant of the type being decoded
    #[error("Invalid {type_name} tag {tag}. This may indicate a malformed or malicious message")]
    InvalidTag {
        type_name: &'static str,
        tag: u64,
    },

    /// String bytes were not valid UTF-8
    #[error("String payload is not valid UTF-8")]
    InvalidUtf8,

    /// Decoded fields were individually valid but inconsistent with each other
    #[error("Inconsistent {type_name}: {reason}")]
    Inconsistent {
        type_name: &'static str,
        reason: String,
    },
}
