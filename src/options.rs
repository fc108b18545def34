//! Parser configuration surface (spec.md §6).

/// Options controlling dialect details of the parser. Construct with
/// [`Default::default`] and override individual fields with struct-update
/// syntax.
///
/// ```
/// use dotenv_core::ParserOptions;
///
/// let opts = ParserOptions {
///     allow_single_line_heredocs: true,
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserOptions {
    /// If true, a non-implicit double- or single-quoted value may contain a
    /// literal `\n` and continues until its closing quote instead of being
    /// terminated by the newline. Default: `false`.
    pub allow_single_line_heredocs: bool,

    /// Strip a leading `export ` prefix from keys. Default: `true`.
    pub support_export_prefix: bool,

    /// Treat `:` as equivalent to `=` as a key/value separator. Accepted
    /// unconditionally, with no following-space requirement (spec.md §6, §9
    /// open question resolved in favor of the simpler, unconditional rule).
    /// Default: `true`.
    pub support_colon_separator: bool,

    /// Enable `${VAR}` interpolation resolution. Default: `true`.
    pub interpolation_enabled: bool,

    /// Maximum recursion depth when a substituted value itself contains
    /// `${...}` markers. Default: `64`.
    pub max_interpolation_depth: u32,
}

impl Default for ParserOptions {
    fn default() -> Self {
        ParserOptions {
            allow_single_line_heredocs: false,
            support_export_prefix: true,
            support_colon_separator: true,
            interpolation_enabled: true,
            max_interpolation_depth: 64,
        }
    }
}
