//! Orchestration of the per-pair readers into the public `parse*` entry
//! points (spec.md §4.6 `readPair`, §6 "External interfaces").

use std::convert::Infallible;

use thiserror::Error;

use crate::key::{read_key, EnvKey};
use crate::options::ParserOptions;
use crate::outcome::ReadOutcome;
use crate::pair::{EnvPair, PairList};
use crate::prescan;
use crate::stream::EnvStream;
use crate::interpolate;
use crate::value::{read_value, EnvValue};

/// A non-fatal issue recovered from during parsing (spec.md §7,
/// "Recovered locally"). Collected by [`crate::parse_with_diagnostics`];
/// every other `parse*` entry point discards these silently, matching the
/// rest of the corpus's stance that a malformed `.env` line is dropped, not
/// an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseWarning {
    /// A non-blank line contained no `=` or `:` separator and was discarded.
    #[error("line {line}: no '=' or ':' separator found, line discarded")]
    MissingSeparator { line: usize },
    /// A quote (single, double, backtick, or triple) was never closed before
    /// the input ended.
    #[error("line {line}: quote left unterminated at end of input")]
    UnterminatedQuote { line: usize },
    /// A key was read but no separator was ever found before the input
    /// ended.
    #[error("line {line}: input ended before a separator was found")]
    UnterminatedLine { line: usize },
    /// A `${` was opened but never closed before the value ended.
    #[error("line {line}: '${{' left unclosed at end of value")]
    UnclosedInterpolation { line: usize },
}

/// A caller-supplied variable lookup raised an error during interpolation
/// finalization (spec.md §7, "Surfaced").
#[derive(Debug, Error)]
#[error("variable lookup failed: {0}")]
pub struct LookupError(#[source] Box<dyn std::error::Error + Send + Sync>);

impl LookupError {
    fn wrap<E: std::error::Error + Send + Sync + 'static>(err: E) -> Self {
        LookupError(Box::new(err))
    }
}

fn line_number(input: &[u8], index: usize) -> usize {
    memchr::memchr_iter(b'\n', &input[..index.min(input.len())]).count() + 1
}

/// The shared engine behind every public `parse*` function: runs the
/// pre-scan, the `KeyReader`/`ValueReader` loop, and interpolation
/// finalization, generic over the lookup callback's error type so both the
/// infallible and fallible public entry points can share one implementation.
fn parse_pairs<E>(
    input: &[u8],
    opts: &ParserOptions,
    mut lookup: impl FnMut(&[u8]) -> Result<Option<Vec<u8>>, E>,
) -> Result<(PairList, Vec<ParseWarning>), E> {
    let hints = prescan::scan(input);
    let mut pairs = PairList::with_capacity(hints.estimated_pair_count);
    let mut warnings = Vec::new();
    let mut stream = EnvStream::new(input);
    let mut key = EnvKey::with_capacity(hints.max_key_size);
    let mut value = EnvValue::with_capacity(hints.max_value_size);

    while !stream.eof() {
        let line_start = stream.position();
        key.reset();

        match read_key(&mut key, &mut stream, opts) {
            ReadOutcome::CommentEncountered => continue,
            ReadOutcome::Fail => {
                if !key.is_empty() {
                    warnings.push(ParseWarning::MissingSeparator {
                        line: line_number(input, line_start),
                    });
                }
                continue;
            }
            ReadOutcome::EndOfStreamKey => {
                if !key.is_empty() {
                    warnings.push(ParseWarning::UnterminatedLine {
                        line: line_number(input, line_start),
                    });
                }
                break;
            }
            ReadOutcome::Success | ReadOutcome::EndOfStreamValue => {
                let key_bytes = key.take();
                value.reset();
                let value_outcome = read_value(&mut value, &mut stream, opts);

                if value.has_unclosed_interpolation() {
                    warnings.push(ParseWarning::UnclosedInterpolation {
                        line: line_number(input, line_start),
                    });
                }
                if value_outcome == ReadOutcome::EndOfStreamValue && value.is_in_open_quote() {
                    warnings.push(ParseWarning::UnterminatedQuote {
                        line: line_number(input, line_start),
                    });
                }

                debug_assert!(value_outcome.commits_pair());
                let (value_bytes, interpolations) = value.take();
                pairs.push(EnvPair::new(key_bytes, value_bytes, interpolations));

                if value_outcome.is_terminal() {
                    break;
                }
            }
        }
    }

    interpolate::finalize(&mut pairs, opts, &mut lookup)?;
    Ok((pairs, warnings))
}

fn no_lookup(_: &[u8]) -> Result<Option<Vec<u8>>, Infallible> {
    Ok(None)
}

fn infallible(result: Result<(PairList, Vec<ParseWarning>), Infallible>) -> (PairList, Vec<ParseWarning>) {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

/// Parses `bytes` with default [`ParserOptions`], returning the ordered
/// pairs. Malformed lines are dropped silently; use
/// [`parse_with_diagnostics`] to see what was recovered from.
pub fn parse(bytes: &[u8]) -> PairList {
    parse_with_options(bytes, ParserOptions::default())
}

/// Parses `bytes` under explicit [`ParserOptions`].
pub fn parse_with_options(bytes: &[u8], options: ParserOptions) -> PairList {
    infallible(parse_pairs(bytes, &options, no_lookup)).0
}

/// Parses `bytes`, consulting `lookup` for any `${NAME}` not satisfied by an
/// earlier-or-later pair in the same file (spec.md §4.5). `lookup` returning
/// `None` falls through to the parsed pairs; a name found by neither expands
/// to an empty string.
pub fn parse_with_lookup(
    bytes: &[u8],
    options: ParserOptions,
    mut lookup: impl FnMut(&[u8]) -> Option<Vec<u8>>,
) -> PairList {
    infallible(parse_pairs(bytes, &options, |name| Ok(lookup(name)))).0
}

/// Like [`parse_with_lookup`], but `lookup` may itself fail; a lookup error
/// aborts the parse and is returned as a [`LookupError`] (spec.md §7,
/// "Surfaced").
pub fn parse_with_fallible_lookup<E>(
    bytes: &[u8],
    options: ParserOptions,
    lookup: impl FnMut(&[u8]) -> Result<Option<Vec<u8>>, E>,
) -> Result<PairList, LookupError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    parse_pairs(bytes, &options, lookup)
        .map(|(pairs, _)| pairs)
        .map_err(LookupError::wrap)
}

/// Parses `bytes`, returning both the pairs and the list of non-fatal
/// issues recovered from along the way (spec.md §7 "Recovered locally").
pub fn parse_with_diagnostics(
    bytes: &[u8],
    options: ParserOptions,
) -> (PairList, Vec<ParseWarning>) {
    infallible(parse_pairs(bytes, &options, no_lookup))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs_as_tuples(pairs: &PairList) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|p| {
                (
                    p.key_str().unwrap().to_string(),
                    p.value_str().unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn s1_simple_assignment() {
        let pairs = parse(b"KEY=value\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![("KEY".to_string(), "value".to_string())]
        );
    }

    #[test]
    fn s2_export_prefix_and_double_quoted_value_with_trailing_garbage() {
        let pairs = parse(b"  export FOO = \"bar baz\"  \n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![("FOO".to_string(), "bar baz".to_string())]
        );
    }

    #[test]
    fn s3_forward_reference_resolves() {
        let pairs = parse(b"A=1\n#comment\nB=${A}${C}\nC=2\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "12".to_string()),
                ("C".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn s4_single_quotes_suppress_backslash_escapes() {
        let pairs = parse(b"X='it\\'s'\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![("X".to_string(), "it\\".to_string())]
        );
    }

    #[test]
    fn s5_triple_double_quote_heredoc() {
        let pairs = parse(b"MULTI=\"\"\"\nline1\nline2\n\"\"\"\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![("MULTI".to_string(), "\nline1\nline2\n".to_string())]
        );
    }

    #[test]
    fn s6_circular_reference_resolves_to_empty() {
        let pairs = parse(b"CIRC=${A}\nA=${CIRC}\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![
                ("CIRC".to_string(), "".to_string()),
                ("A".to_string(), "".to_string()),
            ]
        );
    }

    #[test]
    fn multiple_pairs_in_order() {
        let pairs = parse(b"A=1\nB=2\nC=3\n");
        assert_eq!(
            pairs_as_tuples(&pairs),
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
                ("C".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn later_definition_overrides_earlier_one_on_lookup() {
        let pairs = parse(b"A=1\nA=2\n");
        assert_eq!(pairs.get(b"A"), Some(&b"2"[..]));
    }

    #[test]
    fn unquoted_value_keeps_a_literal_double_quote_byte() {
        let pairs = parse(b"FOO=bar\"baz\n");
        assert_eq!(pairs.get(b"FOO"), Some(&b"bar\"baz"[..]));
    }

    #[test]
    fn external_lookup_fills_in_a_name_absent_from_the_file() {
        let pairs = parse_with_lookup(b"A=${HOME}\n", ParserOptions::default(), |name| {
            if name == b"HOME" {
                Some(b"/home/x".to_vec())
            } else {
                None
            }
        });
        assert_eq!(pairs.get(b"A"), Some(&b"/home/x"[..]));
    }

    #[test]
    fn lookup_error_aborts_the_parse() {
        #[derive(Debug)]
        struct Boom;
        impl std::fmt::Display for Boom {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "boom")
            }
        }
        impl std::error::Error for Boom {}

        let result = parse_with_fallible_lookup(b"A=${X}\n", ParserOptions::default(), |_| {
            Err::<Option<Vec<u8>>, Boom>(Boom)
        });
        assert!(result.is_err());
    }

    #[test]
    fn diagnostics_report_missing_separator() {
        let (pairs, warnings) = parse_with_diagnostics(b"not a pair\nKEY=value\n", ParserOptions::default());
        assert_eq!(pairs.len(), 1);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::MissingSeparator { line: 1 })));
    }

    #[test]
    fn diagnostics_report_unterminated_quote() {
        let (pairs, warnings) = parse_with_diagnostics(b"KEY=\"unterminated", ParserOptions::default());
        assert_eq!(pairs.get(b"KEY"), Some(&b"unterminated"[..]));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::UnterminatedQuote { line: 1 })));
    }

    #[test]
    fn diagnostics_report_unclosed_interpolation() {
        let (pairs, warnings) = parse_with_diagnostics(b"KEY=${NOPE", ParserOptions::default());
        assert_eq!(pairs.get(b"KEY"), Some(&b"${NOPE"[..]));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::UnclosedInterpolation { line: 1 })));
    }

    #[test]
    fn blank_lines_produce_no_warnings() {
        let (pairs, warnings) = parse_with_diagnostics(b"\n\nKEY=value\n\n", ParserOptions::default());
        assert_eq!(pairs.len(), 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn single_line_heredoc_option_lets_a_single_quote_span_newlines() {
        let opts = ParserOptions {
            allow_single_line_heredocs: true,
            ..ParserOptions::default()
        };
        let pairs = parse_with_options(b"KEY='a\nb'\n", opts);
        assert_eq!(pairs.get(b"KEY"), Some(&b"a\nb"[..]));
    }

    #[test]
    fn colon_separator_behaves_like_equals() {
        let pairs = parse(b"KEY: value\n");
        assert_eq!(pairs.get(b"KEY"), Some(&b"value"[..]));
    }
}
