//! Delta wire format
//!
//! A delta is a TAB-separated list of tokens, replayed against the source text
//! with a character cursor:
//!
//! ```text
//! =N        copy N characters from the source
//! -N        skip N characters of the source
//! +TEXT     insert TEXT (URI-escaped)
//! ```
//!
//! The format is persisted inside encrypted version payloads and must stay
//! stable: uppercase `%XX` escapes, space written literally.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::diff::{diff, Op};
use crate::error::{DeltaError, Result};

const TOKEN_SEPARATOR: char = '\t';

/// Characters left unescaped in insert text: the URI unreserved and reserved
/// sets plus space. `%`, TAB, newline and all non-ASCII are escaped.
const INSERT_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b' ')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b';')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'#');

/// Serialise ops into the delta wire format.
pub fn encode(ops: &[Op]) -> String {
    let tokens: Vec<String> = ops
        .iter()
        .map(|op| match op {
            Op::Insert(text) => format!("+{}", utf8_percent_encode(text, INSERT_ESCAPE)),
            Op::Delete(_) => format!("-{}", op.char_len()),
            Op::Equal(_) => format!("={}", op.char_len()),
        })
        .collect();
    tokens.join("\t")
}

/// `encode(diff(old, new))`
pub fn delta(old: &str, new: &str) -> String {
    encode(&diff(old, new))
}

/// Parse `delta` against the `source` it was computed from, recovering the
/// full op list. Every source character must be consumed exactly once.
pub fn decode(source: &str, delta: &str) -> Result<Vec<Op>> {
    // Byte offset of every character boundary, including the end.
    let boundaries: Vec<usize> = source
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(source.len()))
        .collect();
    let source_len = boundaries.len() - 1;

    let mut ops = Vec::new();
    let mut cursor = 0usize;

    for token in delta.split(TOKEN_SEPARATOR) {
        let mut chars = token.chars();
        let Some(operator) = chars.next() else {
            continue;
        };
        let param = chars.as_str();

        match operator {
            '+' => {
                let text = unescape(param)?;
                if !text.is_empty() {
                    ops.push(Op::Insert(text));
                }
            }
            '-' | '=' => {
                let n = parse_length(param)?;
                let end = cursor
                    .checked_add(n)
                    .filter(|&end| end <= source_len)
                    .ok_or(DeltaError::DeltaExceedsSource {
                        cursor,
                        len: n,
                        source_len,
                    })?;
                let text = source[boundaries[cursor]..boundaries[end]].to_string();
                cursor = end;

                if text.is_empty() {
                    continue;
                }
                ops.push(if operator == '=' {
                    Op::Equal(text)
                } else {
                    Op::Delete(text)
                });
            }
            _ => return Err(DeltaError::InvalidDeltaToken(token.to_string())),
        }
    }

    if cursor != source_len {
        return Err(DeltaError::DeltaLengthMismatch {
            consumed: cursor,
            source_len,
        });
    }

    tracing::trace!(ops = ops.len(), source_len, "delta decoded");
    Ok(ops)
}

/// Replay `delta` over `source`, producing the target text.
pub fn apply(source: &str, delta: &str) -> Result<String> {
    let ops = decode(source, delta)?;
    Ok(ops
        .iter()
        .filter_map(|op| match op {
            Op::Delete(_) => None,
            Op::Insert(s) | Op::Equal(s) => Some(s.as_str()),
        })
        .collect())
}

fn parse_length(param: &str) -> Result<usize> {
    if param.is_empty() || !param.bytes().all(|b| b.is_ascii_digit()) {
        return Err(DeltaError::InvalidDeltaLength(param.to_string()));
    }
    param
        .parse()
        .map_err(|_| DeltaError::InvalidDeltaLength(param.to_string()))
}

fn unescape(param: &str) -> Result<String> {
    // A literal '+' is data, not an encoded space.
    let escaped = param.replace('+', "%2B");

    let bytes = escaped.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !well_formed {
                return Err(DeltaError::InvalidDeltaToken(format!("+{param}")));
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(&escaped)
        .decode_utf8()
        .map(|text| text.into_owned())
        .map_err(|_| DeltaError::InvalidDeltaToken(format!("+{param}")))
}
