//! Character-level state machine for named parameter references
//!
//! Recognizes `:name` outside of quoted literals and block comments and hands each
//! reference to a callback, which decides how many positional placeholders it
//! expands to. Everything else is copied to the output verbatim.

use std::iter::Peekable;
use std::str::CharIndices;

use super::errors::ParameterParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexState {
    Sql,
    ParameterStart,
    ParameterName,
    SingleQuoted,
    DoubleQuoted,
    BlockComment,
}

/// One `:name` occurrence found in the query text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParameterReference<'a> {
    pub name: &'a str,
    /// Byte offset of the leading `:`
    pub offset: usize,
    /// 1-based index of the first placeholder emitted for this reference
    pub position: usize,
}

pub(crate) fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic()
}

pub(crate) fn is_name_part(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Rewrite `sql`, replacing each parameter reference with `?` placeholders
///
/// `on_reference` returns the replace count for the reference. Returns the
/// rewritten text and the total number of placeholders emitted.
pub(crate) fn rewrite<F>(sql: &str, mut on_reference: F) -> Result<(String, usize), ParameterParseError>
where
    F: FnMut(ParameterReference<'_>) -> Result<usize, ParameterParseError>,
{
    let mut out = String::with_capacity(sql.len() + 16);
    let mut chars: Peekable<CharIndices<'_>> = sql.char_indices().peekable();
    let mut state = LexState::Sql;
    let mut next_position = 1;
    // Byte offset where the current parameter, literal or comment began
    let mut start = 0;

    loop {
        match state {
            LexState::Sql => {
                let Some((offset, ch)) = chars.next() else { break };
                match ch {
                    '\'' => {
                        out.push(ch);
                        start = offset;
                        state = LexState::SingleQuoted;
                    }
                    '"' => {
                        out.push(ch);
                        start = offset;
                        state = LexState::DoubleQuoted;
                    }
                    '/' if matches!(chars.peek(), Some((_, '*'))) => {
                        chars.next();
                        out.push_str("/*");
                        start = offset;
                        state = LexState::BlockComment;
                    }
                    ':' => {
                        start = offset;
                        state = LexState::ParameterStart;
                    }
                    _ => out.push(ch),
                }
            }

            LexState::ParameterStart => match chars.peek() {
                Some(&(_, ch)) if is_name_start(ch) => state = LexState::ParameterName,
                Some(&(_, ':')) => {
                    // PostgreSQL cast operator, never a parameter
                    chars.next();
                    out.push_str("::");
                    state = LexState::Sql;
                }
                _ => {
                    out.push(':');
                    state = LexState::Sql;
                }
            },

            LexState::ParameterName => {
                let name_start = start + 1;
                let mut name_end = name_start;
                while let Some(&(offset, ch)) = chars.peek() {
                    if !is_name_part(ch) {
                        break;
                    }
                    name_end = offset + ch.len_utf8();
                    chars.next();
                }

                let count = on_reference(ParameterReference {
                    name: &sql[name_start..name_end],
                    offset: start,
                    position: next_position,
                })?;
                push_placeholders(&mut out, count);
                next_position += count;
                state = LexState::Sql;
            }

            LexState::SingleQuoted | LexState::DoubleQuoted => {
                let quote = if state == LexState::SingleQuoted { '\'' } else { '"' };
                let Some((_, ch)) = chars.next() else {
                    return Err(ParameterParseError::UnterminatedLiteral {
                        quote,
                        offset: start,
                    });
                };
                out.push(ch);
                // A doubled quote closes and immediately reopens the literal
                if ch == quote {
                    state = LexState::Sql;
                }
            }

            LexState::BlockComment => {
                let Some((_, ch)) = chars.next() else {
                    return Err(ParameterParseError::UnterminatedComment { offset: start });
                };
                out.push(ch);
                if ch == '*' && matches!(chars.peek(), Some((_, '/'))) {
                    chars.next();
                    out.push('/');
                    state = LexState::Sql;
                }
            }
        }
    }

    Ok((out, next_position - 1))
}

fn push_placeholders(out: &mut String, count: usize) {
    for i in 0..count {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
}
