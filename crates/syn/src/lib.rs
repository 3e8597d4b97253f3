use std::ops::Range;

use logos::Span;

pub mod node;
pub mod string;

pub use node::SynTag;

/// The main lexer used in fig.
///
/// It is a thin layer over the generated [`logos`] lexer that adds the single
/// token of lookahead the reader needs.
pub struct Lexer<'lex> {
    /// The actual lexer that does the job.
    inner: logos::Lexer<'lex, SynTag>,
    /// The span of the last token
    span: Span,
    /// The token that has been peeked but not yet consumed.
    peeked: Option<Option<(SynTag, Span)>>,
}

impl<'lex> Lexer<'lex> {
    /// Create a new lexer from string.
    pub fn new(s: &'lex str) -> Lexer<'lex> {
        Lexer {
            inner: logos::Lexer::new(s),
            span: Default::default(),
            peeked: None,
        }
    }

    /// The span of the current token.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    /// The slice of string of the current token.
    pub fn slice(&self) -> &'lex str {
        &self.inner.source()[self.span()]
    }

    fn fill_peek(&mut self) -> Option<(SynTag, Span)> {
        if self.peeked.is_none() {
            let next = self.inner.next().map(|tok| (tok, self.inner.span()));
            self.peeked = Some(next);
        }
        self.peeked.clone().flatten()
    }

    /// Return a copy of the current front token without really consuming it.
    pub fn peek(&mut self) -> Option<SynTag> {
        self.fill_peek().map(|(tag, _)| tag)
    }

    pub fn peek_span(&mut self) -> Range<usize> {
        self.fill_peek().map(|(_, s)| s).unwrap_or_default()
    }

    pub fn peek_slice(&mut self) -> &'lex str {
        &self.inner.source()[self.peek_span()]
    }

    /// Whether all input has been consumed.
    pub fn at_end(&mut self) -> bool {
        self.peek().is_none()
    }
}

impl<'lex> Iterator for Lexer<'lex> {
    type Item = SynTag;

    fn next(&mut self) -> Option<Self::Item> {
        // take the peeked token or lex the next one
        let next = match self.peeked.take() {
            Some(peeked) => peeked,
            None => self.inner.next().map(|tok| (tok, self.inner.span())),
        };
        let (tok, span) = next?;
        tracing::trace!(?tok, ?span, "lexed");
        self.span = span;
        Some(tok)
    }
}
