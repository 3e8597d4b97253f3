use logos::Logos;

/// The syntax tag type.
///
/// Every token the reader consumes is tagged with one of these. Keywords are
/// promoted out of the symbol space here, so `define` never reaches the
/// reader as a plain symbol.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SynTag {
    // === Aux Tokens ===
    /// Anything that doesn't match. Whitespace is skipped here as well.
    #[error]
    #[regex(r"\s+", logos::skip)]
    Error,

    // === Keywords ===
    #[token("nil")]
    NilKw,
    #[token("true")]
    TrueKw,
    #[token("false")]
    FalseKw,
    #[token("def")]
    #[token("define")]
    DefineKw,
    #[token("quote")]
    QuoteKw,
    // `if` is an alias of `cond`, they share the same clause syntax
    #[token("cond")]
    #[token("if")]
    CondKw,
    #[token("lambda")]
    LambdaKw,
    #[token("set!")]
    SetKw,
    #[token("begin")]
    BeginKw,

    // === Literal Tokens ===
    /// A sign is only part of a number when a digit follows it. A bare `+` or
    /// `-` is a symbol.
    #[regex(r"[+-]?[0-9]+", priority = 3)]
    Int,
    #[regex(r"[+-]?[0-9]+/[0-9]+", priority = 3)]
    Rational,
    #[regex(r"[+-]?[0-9]+\.[0-9]+", priority = 3)]
    Decimal,

    /// A double-quoted string. Escapes are resolved afterwards by
    /// [`crate::string::unescape`].
    #[regex(r#""([^"\\]|\\(.|\n))*""#)]
    String,
    /// A string that runs into the end of input.
    #[regex(r#""([^"\\]|\\(.|\n))*"#)]
    UnterminatedString,

    /// A maximal run of anything but whitespace and `)`. A sign followed by a
    /// digit always starts a number instead, so `-5x` is `-5` then `x`.
    #[regex(r#"[^\s()'".0-9+-][^\s)]*"#)]
    #[regex(r"[+-]")]
    #[regex(r"[+-][^\s)0-9][^\s)]*")]
    Symbol,

    // === Punctuation ===
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(".")]
    Dot,
    #[token("'")]
    Tick,
}

impl SynTag {
    /// Whether this token is one of the reserved words.
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            SynTag::NilKw
                | SynTag::TrueKw
                | SynTag::FalseKw
                | SynTag::DefineKw
                | SynTag::QuoteKw
                | SynTag::CondKw
                | SynTag::LambdaKw
                | SynTag::SetKw
                | SynTag::BeginKw
        )
    }

    /// Whether this token is a numeric literal.
    pub fn is_number(self) -> bool {
        matches!(self, SynTag::Int | SynTag::Rational | SynTag::Decimal)
    }
}
