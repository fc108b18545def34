//! Reads one key up to its `=`/`:` separator, handling the POSIX `export`
//! prefix (spec.md §4.2).

use crate::buffer::ReusableBuffer;
use crate::options::ParserOptions;
use crate::outcome::ReadOutcome;
use crate::stream::EnvStream;

const EXPORT_PREFIX: &[u8] = b"export ";

/// In-flight state for the key currently being parsed. Reused across pairs
/// via [`EnvKey::reset`].
pub(crate) struct EnvKey {
    buffer: ReusableBuffer,
}

impl EnvKey {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        EnvKey {
            buffer: ReusableBuffer::with_capacity(capacity),
        }
    }

    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Right-trims trailing spaces, then hands the key bytes to the caller
    /// as an exact-sized owned buffer (spec.md §4.6 steps 2-3).
    pub(crate) fn take(&mut self) -> Vec<u8> {
        let mut len = self.buffer.len();
        while len > 0 && self.buffer.as_slice()[len - 1] == b' ' {
            len -= 1;
        }
        self.buffer.truncate(len);
        self.buffer.take()
    }
}

/// Reads one key from `stream` into `key`, stopping just past the separator.
/// See spec.md §4.2 for the full rule set.
pub(crate) fn read_key(
    key: &mut EnvKey,
    stream: &mut EnvStream<'_>,
    opts: &ParserOptions,
) -> ReadOutcome {
    // Leading space trim.
    while stream.peek() == Some(b' ') {
        stream.get();
    }

    loop {
        let Some(byte) = stream.get() else {
            return ReadOutcome::EndOfStreamKey;
        };

        match byte {
            b'#' => {
                stream.skip_to_newline();
                return ReadOutcome::CommentEncountered;
            }
            b'\r' => continue,
            b'\n' => return ReadOutcome::Fail,
            b'=' => return conclude_after_separator(stream),
            b':' if opts.support_colon_separator => return conclude_after_separator(stream),
            other => key.buffer.push(other),
        }

        if opts.support_export_prefix
            && key.buffer.len() == EXPORT_PREFIX.len()
            && key.buffer.as_slice() == EXPORT_PREFIX
        {
            key.buffer.clear();
        }
    }
}

fn conclude_after_separator(stream: &mut EnvStream<'_>) -> ReadOutcome {
    if stream.eof() {
        ReadOutcome::EndOfStreamValue
    } else {
        ReadOutcome::Success
    }
}
