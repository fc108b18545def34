//! In-flight value state and the value-reading state machine (spec.md §3
//! `EnvValue`, §4.3 `ValueReader`).
//!
//! This is the largest component by design (spec.md §2 budgets it at ~30%
//! of the implementation): a per-byte dispatch disambiguating single,
//! double, backtick, triple-quote (heredoc), and implicit-double-quote
//! dialects, while recording `${NAME}` interpolation positions and
//! collapsing backslash escapes as it goes.

use crate::buffer::ReusableBuffer;
use crate::escape;
use crate::escape::preceded_by_odd_backslashes;
use crate::outcome::ReadOutcome;
use crate::options::ParserOptions;
use crate::quote::{self, CloseOutcome, QuoteChar};
use crate::span::VariablePosition;
use crate::stream::EnvStream;

/// In-flight state for the value currently being parsed. Reused across pairs
/// within one parse via [`EnvValue::reset`] (spec.md §5).
pub(crate) struct EnvValue {
    buffer: ReusableBuffer,

    quoted: bool,
    triple_quoted: bool,
    double_quoted: bool,
    triple_double_quoted: bool,
    backtick_quoted: bool,
    implicit_double_quote: bool,

    single_quote_streak: u32,
    double_quote_streak: u32,
    back_slash_streak: u32,

    is_parsing_variable: bool,
    current_variable_start: usize,
    interpolations: Vec<VariablePosition>,
}

impl EnvValue {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        EnvValue {
            buffer: ReusableBuffer::with_capacity(capacity),
            quoted: false,
            triple_quoted: false,
            double_quoted: false,
            triple_double_quoted: false,
            backtick_quoted: false,
            implicit_double_quote: false,
            single_quote_streak: 0,
            double_quote_streak: 0,
            back_slash_streak: 0,
            is_parsing_variable: false,
            current_variable_start: 0,
            interpolations: Vec::new(),
        }
    }

    /// Clears all per-pair state so the buffer and position list can be
    /// reused for the next value.
    pub(crate) fn reset(&mut self) {
        self.buffer.clear();
        self.quoted = false;
        self.triple_quoted = false;
        self.double_quoted = false;
        self.triple_double_quoted = false;
        self.backtick_quoted = false;
        self.implicit_double_quote = false;
        self.single_quote_streak = 0;
        self.double_quote_streak = 0;
        self.back_slash_streak = 0;
        self.is_parsing_variable = false;
        self.current_variable_start = 0;
        self.interpolations.clear();
    }

    /// True if the value was left inside an opened, never-closed quote mode
    /// (any family except implicit-double-quote, which has no delimiter to
    /// leave unclosed). Checked by the caller right after
    /// [`crate::outcome::ReadOutcome::EndOfStreamValue`], before [`Self::take`]
    /// clears this state.
    #[inline]
    pub(crate) fn is_in_open_quote(&self) -> bool {
        self.quoted
            || self.triple_quoted
            || self.backtick_quoted
            || self.triple_double_quoted
            || (self.double_quoted && !self.implicit_double_quote)
    }

    /// True if a `${` was opened but never matched by a closing `}` before
    /// the value ended.
    #[inline]
    pub(crate) fn has_unclosed_interpolation(&self) -> bool {
        self.is_parsing_variable
    }

    #[inline]
    fn any_mode_opened(&self) -> bool {
        self.quoted
            || self.triple_quoted
            || self.double_quoted
            || self.triple_double_quoted
            || self.backtick_quoted
            || self.implicit_double_quote
    }

    /// Transfers the accumulated value into an exactly-sized owned buffer
    /// together with its recorded interpolation positions, then clears
    /// `self` for reuse. Any still-open (unclosed) `${` position was never
    /// pushed to `interpolations` in the first place, so there is nothing to
    /// strip here (spec.md §4.5 `remove_unclosed_interpolation` is a no-op by
    /// construction, see DESIGN.md).
    pub(crate) fn take(&mut self) -> (Vec<u8>, Vec<VariablePosition>) {
        let bytes = self.buffer.take();
        let interpolations = std::mem::take(&mut self.interpolations);
        self.is_parsing_variable = false;
        (bytes, interpolations)
    }
}

fn right_trim_spaces(buffer: &mut ReusableBuffer) {
    let mut len = buffer.len();
    while len > 0 && buffer.as_slice()[len - 1] == b' ' {
        len -= 1;
    }
    buffer.truncate(len);
}

/// Reads one value from `stream` into `value`, starting just after the
/// key/value separator. See spec.md §4.3 for the full per-byte dispatch
/// table this implements.
pub(crate) fn read_value(
    value: &mut EnvValue,
    stream: &mut EnvStream<'_>,
    opts: &ParserOptions,
) -> ReadOutcome {
    // Leading spaces right after the separator are insignificant regardless
    // of which dialect the value turns out to be (this is what makes
    // `FOO = "bar baz"` classify as double-quoted rather than as an
    // implicit-double-quote value that happens to start with a quote
    // character as its first non-space byte; see DESIGN.md).
    while stream.peek() == Some(b' ') {
        stream.get();
    }

    if value.buffer.is_empty() && !value.any_mode_opened() {
        match stream.peek() {
            None => return ReadOutcome::EndOfStreamValue,
            Some(b'`') => {
                stream.get();
                value.double_quoted = true;
                value.backtick_quoted = true;
            }
            Some(b'#') => {
                stream.get();
                stream.skip_to_newline();
                return ReadOutcome::CommentEncountered;
            }
            Some(b'\'') => {
                stream.get();
                match quote::open(stream, QuoteChar::Single) {
                    quote::OpenedMode::Single => value.quoted = true,
                    quote::OpenedMode::Triple => value.triple_quoted = true,
                }
            }
            Some(b'"') => {
                stream.get();
                match quote::open(stream, QuoteChar::Double) {
                    quote::OpenedMode::Single => value.double_quoted = true,
                    quote::OpenedMode::Triple => value.triple_double_quoted = true,
                }
            }
            Some(_) => {
                value.implicit_double_quote = true;
                value.double_quoted = true;
            }
        }
    }

    loop {
        // Implicit-double-quote left trim: further leading spaces are
        // dropped until real content starts.
        if value.implicit_double_quote && value.buffer.is_empty() && stream.peek() == Some(b' ') {
            stream.get();
            continue;
        }

        let Some(byte) = stream.get() else {
            return ReadOutcome::EndOfStreamValue;
        };

        // Pre-pass: resolve a pending backslash streak against this byte.
        if value.back_slash_streak > 0 && byte != b'\\' {
            let streak = value.back_slash_streak;
            value.back_slash_streak = 0;
            let remainder = escape::walk_backslashes(&mut value.buffer, streak);
            if remainder == 1 {
                if let Some(mapped) = escape::translate_control_character(byte) {
                    value.buffer.push(mapped);
                    continue;
                }
                value.buffer.push(b'\\');
                // unrecognized escape: literal backslash appended, byte
                // falls through to normal dispatch below.
            }
        }

        // Pre-pass: resolve a pending single-quote close streak.
        if value.single_quote_streak > 0 && byte != b'\'' {
            match quote::resolve_close(value.triple_quoted, value.single_quote_streak) {
                CloseOutcome::Closed => {
                    value.single_quote_streak = 0;
                    stream.skip_to_newline();
                    return ReadOutcome::Success;
                }
                CloseOutcome::Literal { quotes } => {
                    value.single_quote_streak = 0;
                    for _ in 0..quotes {
                        value.buffer.push(b'\'');
                    }
                }
            }
        }

        // Pre-pass: resolve a pending double-quote close streak.
        if value.double_quote_streak > 0 && byte != b'"' {
            match quote::resolve_close(value.triple_double_quoted, value.double_quote_streak) {
                CloseOutcome::Closed => {
                    value.double_quote_streak = 0;
                    stream.skip_to_newline();
                    return ReadOutcome::Success;
                }
                CloseOutcome::Literal { quotes } => {
                    value.double_quote_streak = 0;
                    for _ in 0..quotes {
                        value.buffer.push(b'"');
                    }
                }
            }
        }

        match byte {
            b'`' => {
                if value.backtick_quoted {
                    stream.skip_to_newline();
                    return ReadOutcome::Success;
                }
                value.buffer.push(b'`');
            }
            b'#' => {
                if value.implicit_double_quote {
                    stream.skip_to_newline();
                    if value.implicit_double_quote {
                        right_trim_spaces(&mut value.buffer);
                    }
                    return ReadOutcome::Success;
                }
                value.buffer.push(b'#');
            }
            b'\n' => {
                let heredoc_active = value.triple_quoted || value.triple_double_quoted;
                let single_line_heredoc = opts.allow_single_line_heredocs
                    && ((value.double_quoted && !value.implicit_double_quote) || value.quoted);
                if heredoc_active || single_line_heredoc {
                    value.buffer.push(b'\n');
                } else {
                    if value.buffer.last() == Some(b'\r') {
                        value.buffer.truncate(value.buffer.len() - 1);
                    }
                    if value.implicit_double_quote {
                        right_trim_spaces(&mut value.buffer);
                    }
                    return ReadOutcome::Success;
                }
            }
            b'\\' => {
                if value.quoted || value.triple_quoted {
                    value.buffer.push(b'\\');
                } else {
                    value.back_slash_streak += 1;
                }
            }
            // `\r` is a literal byte inside heredocs, and skipped elsewhere
            // (spec.md §9; mirrors key.rs's unconditional `\r` skip).
            b'\r' if !(value.triple_quoted || value.triple_double_quoted) => {}
            b'{' => {
                let at = value.buffer.len();
                let brace_escaped = preceded_by_odd_backslashes(value.buffer.as_slice(), at);
                value.buffer.push(b'{');
                if !(value.quoted || value.triple_quoted)
                    && !value.is_parsing_variable
                    && !brace_escaped
                    && at >= 1
                    && value.buffer.as_slice()[at - 1] == b'$'
                    && !preceded_by_odd_backslashes(value.buffer.as_slice(), at - 1)
                {
                    value.is_parsing_variable = true;
                    value.current_variable_start = at - 1;
                }
            }
            b'}' => {
                let at = value.buffer.len();
                let brace_escaped = preceded_by_odd_backslashes(value.buffer.as_slice(), at);
                value.buffer.push(b'}');
                if value.is_parsing_variable && !brace_escaped {
                    value.interpolations.push(VariablePosition {
                        start: value.current_variable_start,
                        end: value.buffer.len(),
                    });
                    value.is_parsing_variable = false;
                }
            }
            b'\'' if !value.double_quoted => {
                if value.quoted || value.triple_quoted {
                    value.single_quote_streak += 1;
                    let decide_now = !value.triple_quoted || value.single_quote_streak == 3;
                    if decide_now {
                        match quote::resolve_close(value.triple_quoted, value.single_quote_streak)
                        {
                            CloseOutcome::Closed => {
                                value.single_quote_streak = 0;
                                stream.skip_to_newline();
                                return ReadOutcome::Success;
                            }
                            CloseOutcome::Literal { quotes } => {
                                value.single_quote_streak = 0;
                                for _ in 0..quotes {
                                    value.buffer.push(b'\'');
                                }
                            }
                        }
                    }
                } else {
                    value.buffer.push(b'\'');
                }
            }
            b'"' if !(value.quoted
                || value.triple_quoted
                || value.backtick_quoted
                || value.implicit_double_quote) =>
            {
                if value.double_quoted || value.triple_double_quoted {
                    value.double_quote_streak += 1;
                    let decide_now =
                        !value.triple_double_quoted || value.double_quote_streak == 3;
                    if decide_now {
                        match quote::resolve_close(
                            value.triple_double_quoted,
                            value.double_quote_streak,
                        ) {
                            CloseOutcome::Closed => {
                                value.double_quote_streak = 0;
                                stream.skip_to_newline();
                                return ReadOutcome::Success;
                            }
                            CloseOutcome::Literal { quotes } => {
                                value.double_quote_streak = 0;
                                for _ in 0..quotes {
                                    value.buffer.push(b'"');
                                }
                            }
                        }
                    }
                } else {
                    value.buffer.push(b'"');
                }
            }
            other => value.buffer.push(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &[u8], opts: &ParserOptions) -> (ReadOutcome, Vec<u8>, Vec<VariablePosition>) {
        let mut value = EnvValue::with_capacity(16);
        let mut stream = EnvStream::new(input);
        let outcome = read_value(&mut value, &mut stream, opts);
        let (bytes, interpolations) = value.take();
        (outcome, bytes, interpolations)
    }

    #[test]
    fn unquoted_value_stops_at_newline() {
        let (outcome, bytes, _) = read(b"value\nNEXT=1", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"value");
    }

    #[test]
    fn double_quoted_value_keeps_inner_spaces_and_discards_garbage() {
        let (outcome, bytes, _) = read(br#""bar baz"  garbage"#, &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"bar baz");
    }

    #[test]
    fn leading_spaces_before_quote_are_skipped() {
        let (outcome, bytes, _) = read(br#"   "bar baz"  "#, &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"bar baz");
    }

    #[test]
    fn single_quotes_suppress_backslash_escapes() {
        let (outcome, bytes, _) = read(b"'it\\'s'", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"it\\");
    }

    #[test]
    fn triple_double_quote_heredoc_spans_newlines() {
        let (outcome, bytes, _) = read(b"\"\"\"\nline1\nline2\n\"\"\"\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"\nline1\nline2\n");
    }

    #[test]
    fn backtick_quoted_value() {
        let (outcome, bytes, _) = read(b"`hello world`", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"hello world");
    }

    #[test]
    fn implicit_value_strips_inline_comment() {
        let (outcome, bytes, _) = read(b"8080 # web server\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"8080");
    }

    #[test]
    fn hash_inside_double_quotes_is_literal() {
        let (outcome, bytes, _) = read(br#""value#notacomment""#, &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"value#notacomment");
    }

    #[test]
    fn double_quote_byte_inside_implicit_value_is_literal() {
        let (outcome, bytes, _) = read(b"bar\"baz\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"bar\"baz");
    }

    #[test]
    fn bare_carriage_return_outside_heredoc_is_skipped() {
        let (outcome, bytes, _) = read(b"a\rb\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"ab");
    }

    #[test]
    fn bare_carriage_return_inside_heredoc_is_literal() {
        let (outcome, bytes, _) = read(b"\"\"\"\na\rb\n\"\"\"\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"\na\rb\n");
    }

    #[test]
    fn value_only_comment_is_comment_encountered() {
        let (outcome, bytes, _) = read(b"# nothing here\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::CommentEncountered);
        assert!(bytes.is_empty());
    }

    #[test]
    fn escape_sequences_translate() {
        let (outcome, bytes, _) = read(br#""line1\nline2\ttab""#, &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"line1\nline2\ttab");
    }

    #[test]
    fn unknown_escape_is_kept_literal() {
        let (outcome, bytes, _) = read(br#""\q""#, &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"\\q");
    }

    #[test]
    fn interpolation_position_is_recorded() {
        let (outcome, bytes, positions) = read(b"${A}${C}\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"${A}${C}");
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[0].name_slice(&bytes), b"A");
        assert_eq!(positions[1].name_slice(&bytes), b"C");
    }

    #[test]
    fn escaped_dollar_brace_does_not_open_interpolation() {
        // `$` is not one of the recognized control-escape characters, so the
        // backslash is kept literally (same rule `unknown_escape_is_kept_literal`
        // exercises) — what matters here is that the preceding backslash
        // still suppresses interpolation from opening.
        let (outcome, bytes, positions) = read(b"\\${A}\n", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::Success);
        assert_eq!(bytes, b"\\${A}");
        assert!(positions.is_empty());
    }

    #[test]
    fn unclosed_interpolation_is_dropped_at_eof() {
        let (outcome, bytes, positions) = read(b"${NOPE", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::EndOfStreamValue);
        assert_eq!(bytes, b"${NOPE");
        assert!(positions.is_empty());
    }

    #[test]
    fn end_of_stream_immediately() {
        let (outcome, bytes, _) = read(b"", &ParserOptions::default());
        assert_eq!(outcome, ReadOutcome::EndOfStreamValue);
        assert!(bytes.is_empty());
    }
}
