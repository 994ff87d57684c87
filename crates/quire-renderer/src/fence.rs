//! Code fence tracking for the preprocessing pass.
//!
//! Custom syntax inside fenced code blocks is left untouched.

/// Tracks fenced code block state during line-by-line processing.
///
/// Fences use backticks or tildes (three or more), optionally behind
/// blockquote markers. The closing fence must use the same character and be
/// at least as long as the opening fence.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    fence_char: Option<char>,
    fence_len: usize,
}

impl FenceTracker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Feed one line. Returns `true` if the line opens or closes a fence.
    pub(crate) fn update(&mut self, line: &str) -> bool {
        let trimmed = strip_container_prefix(line);

        match self.fence_char {
            Some(fence_char) => {
                if is_closing_fence(trimmed, fence_char, self.fence_len) {
                    self.fence_char = None;
                    self.fence_len = 0;
                    return true;
                }
                false
            }
            None => match detect_fence(trimmed) {
                Some((ch, len)) => {
                    self.fence_char = Some(ch);
                    self.fence_len = len;
                    true
                }
                None => false,
            },
        }
    }
}

/// Strip indentation and blockquote markers.
fn strip_container_prefix(line: &str) -> &str {
    let mut rest = line.trim_start();
    while let Some(inner) = rest.strip_prefix('>') {
        rest = inner.trim_start();
    }
    rest
}

fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    // Backtick fences cannot carry backticks in their info string.
    if count < 3 || (first == '`' && trimmed[count..].contains('`')) {
        return None;
    }
    Some((first, count))
}

fn is_closing_fence(trimmed: &str, expected: char, min_len: usize) -> bool {
    let count = trimmed.chars().take_while(|&c| c == expected).count();
    count >= min_len && trimmed[count..].chars().all(char::is_whitespace)
}
