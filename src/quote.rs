//! Single/double/triple-quote opening, closing, and transitions (spec.md §4.3,
//! "Quote walker semantics").
//!
//! Opening is decided with a bounded lookahead (spec.md §4.3's "streak of 3
//! on an empty value opens triple" requires seeing all three quote bytes
//! before the mode is fixed, which a single trailing-byte decision cannot
//! express without look-ahead — see DESIGN.md for the worked-through
//! rationale), while closing is resolved by the streak-and-defer mechanism
//! spec.md describes, which has no such ambiguity once a mode is open.

use crate::stream::EnvStream;

/// Which quote character family is being matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum QuoteChar {
    Single,
    Double,
}

impl QuoteChar {
    #[inline]
    pub(crate) fn byte(self) -> u8 {
        match self {
            QuoteChar::Single => b'\'',
            QuoteChar::Double => b'"',
        }
    }
}

/// The mode an opening quote resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenedMode {
    Single,
    Triple,
}

/// Decides single- vs triple-quote opening by looking two bytes ahead of the
/// cursor. The first quote byte has already been consumed by the caller
/// (the value reader's first-byte dispatch); this consumes the following two
/// bytes only when they complete a triple.
pub(crate) fn open(stream: &mut EnvStream, quote: QuoteChar) -> OpenedMode {
    let q = quote.byte();
    if stream.peek_ahead(0) == Some(q) && stream.peek_ahead(1) == Some(q) {
        stream.get();
        stream.get();
        OpenedMode::Triple
    } else {
        OpenedMode::Single
    }
}

/// Outcome of resolving a pending run of `streak` closing-quote bytes while
/// already inside an opened quote mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CloseOutcome {
    /// The mode closes; the value is complete.
    Closed,
    /// The run did not reach the count needed to close (only relevant in
    /// triple mode); append `literal_quotes` quote bytes back as content and
    /// remain open.
    Literal { quotes: u32 },
}

/// Resolves a streak of consecutive closing-quote bytes seen while already
/// inside a quote mode. In single mode any streak of 1 or more closes
/// immediately (callers invoke this the moment the first closing quote byte
/// is seen, so `streak` is always 1 there). In triple mode, only a streak of
/// exactly 3 closes; shorter runs (discovered once a non-quote byte follows,
/// via the value reader's streak-resolution pre-pass) were not a closing
/// delimiter and are appended back as literal quote bytes.
pub(crate) fn resolve_close(triple: bool, streak: u32) -> CloseOutcome {
    if !triple {
        debug_assert!(streak >= 1, "single-quote close invoked with no streak");
        CloseOutcome::Closed
    } else if streak >= 3 {
        CloseOutcome::Closed
    } else {
        CloseOutcome::Literal { quotes: streak }
    }
}
