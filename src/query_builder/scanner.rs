use crate::types::Dialect;

/// Lexical context of the byte currently being scanned.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment,
}

/// A run of `?` found outside literals and comments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Placeholder {
    pub(super) start: usize,
    pub(super) len: usize,
}

/// MySQL only reads `--` as a comment when whitespace, a control byte or the end of input
/// follows it; `a--1` is arithmetic there.
pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize, dialect: Dialect) -> bool {
    match bytes.get(idx) {
        Some(b'#') => dialect == Dialect::MySql,
        Some(b'-') if bytes.get(idx + 1) == Some(&b'-') => match dialect {
            Dialect::MySql => bytes
                .get(idx + 2)
                .is_none_or(|b| b.is_ascii_whitespace() || b.is_ascii_control()),
            Dialect::Sqlite => true,
        },
        _ => false,
    }
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

/// Locate every `?` run in `sql` that sits outside quoted text and comments.
pub(super) fn find_placeholders(sql: &str, dialect: Dialect) -> Vec<Placeholder> {
    let bytes = sql.as_bytes();
    let backslash_escapes = dialect == Dialect::MySql;
    let mut found = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                _ if is_line_comment_start(bytes, idx, dialect) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment;
                    idx += 1;
                }
                b'?' => {
                    let start = idx;
                    while bytes.get(idx + 1) == Some(&b'?') {
                        idx += 1;
                    }
                    found.push(Placeholder {
                        start,
                        len: idx + 1 - start,
                    });
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted | State::BacktickQuoted => {
                let quote = match state {
                    State::SingleQuoted => b'\'',
                    State::DoubleQuoted => b'"',
                    _ => b'`',
                };
                if b == b'\\' && backslash_escapes && quote != b'`' {
                    idx += 1; // skip escaped byte
                } else if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        idx += 1; // skip doubled quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment => {
                if is_block_comment_end(bytes, idx) {
                    state = State::Normal;
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    found
}
