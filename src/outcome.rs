//! The shared outcome kinds produced by [`crate::key::read_key`] and
//! [`crate::value::read_value`] (spec.md §7).

/// The internal result of reading one key or one value. At the public
/// boundary these all reduce to "a `PairList` was produced" (spec.md §7) —
/// `ReadOutcome` never crosses `dotenv_core`'s public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// A key or value was read to a well-formed terminator; more input may
    /// remain.
    Success,
    /// A `#` was seen before any key content accumulated: the rest of the
    /// line was a comment, not a key/value pair.
    CommentEncountered,
    /// End of input reached while still reading a key, with a non-empty key
    /// buffer. Terminal: the outer loop stops after handling this outcome.
    EndOfStreamKey,
    /// End of input reached while reading (or immediately after opening) a
    /// value. Terminal.
    EndOfStreamValue,
    /// The line did not define a key (e.g. a bare newline, or only
    /// whitespace) and is discarded without producing a pair.
    Fail,
}

impl ReadOutcome {
    /// Terminal outcomes end the read loop once handled, per spec.md §4.6
    /// step 6.
    #[inline]
    pub(crate) fn is_terminal(self) -> bool {
        matches!(
            self,
            ReadOutcome::EndOfStreamKey | ReadOutcome::EndOfStreamValue
        )
    }

    /// Outcomes after which the in-flight pair should still be committed to
    /// the `PairList` (spec.md §4.6 step 4).
    #[inline]
    pub(crate) fn commits_pair(self) -> bool {
        matches!(
            self,
            ReadOutcome::Success | ReadOutcome::EndOfStreamValue | ReadOutcome::CommentEncountered
        )
    }
}
