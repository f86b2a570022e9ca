//! Tokens are the unit the indexer consumes.
//!
//! Analysis (splitting, normalizing, stemming...) happens outside of the
//! indexer. By the time a field reaches the indexer, it is a [`TokenStream`]
//! of already produced tokens. This crate only defines that boundary, so that
//! analyzers don't need to depend on the indexer.

use std::borrow::{Borrow, BorrowMut};
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

/// Token
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
pub struct Token {
    /// Term bytes, as they should be indexed.
    pub term: Vec<u8>,
    /// Distance, in positions, from the previous token of the field.
    ///
    /// `0` stacks the token on the previous one (synonyms).
    pub position_increment: u32,
    /// Offset of the first character of the token.
    pub offset_from: u32,
    /// Offset of the last character of the token + 1.
    pub offset_to: u32,
    /// Number of occurrences this token stands for.
    ///
    /// Only fields that do not index positions accept a value other than 1.
    pub term_freq: u32,
    /// Arbitrary bytes attached to this occurrence.
    pub payload: Option<Vec<u8>>,
}

impl Default for Token {
    fn default() -> Token {
        Token {
            term: Vec::new(),
            position_increment: 1,
            offset_from: 0,
            offset_to: 0,
            term_freq: 1,
            payload: None,
        }
    }
}

impl Token {
    /// Creates a token with a position increment of 1 and no payload.
    pub fn new(term: impl Into<Vec<u8>>, offset_from: u32, offset_to: u32) -> Token {
        Token {
            term: term.into(),
            offset_from,
            offset_to,
            ..Token::default()
        }
    }

    #[must_use]
    pub fn with_position_increment(mut self, position_increment: u32) -> Token {
        self.position_increment = position_increment;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Token {
        self.payload = Some(payload.into());
        self
    }

    #[must_use]
    pub fn with_term_freq(mut self, term_freq: u32) -> Token {
        self.term_freq = term_freq;
        self
    }
}

/// Simple wrapper of `Box<dyn TokenStream + 'a>`.
///
/// See [`TokenStream`] for more information.
pub struct BoxTokenStream<'a>(Box<dyn TokenStream + 'a>);

impl<'a, T> From<T> for BoxTokenStream<'a>
where
    T: TokenStream + 'a,
{
    fn from(token_stream: T) -> BoxTokenStream<'a> {
        BoxTokenStream(Box::new(token_stream))
    }
}

impl<'a> Deref for BoxTokenStream<'a> {
    type Target = dyn TokenStream + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

impl<'a> DerefMut for BoxTokenStream<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.0
    }
}

impl<'a> TokenStream for Box<dyn TokenStream + 'a> {
    fn advance(&mut self) -> bool {
        let token_stream: &mut dyn TokenStream = self.borrow_mut();
        token_stream.advance()
    }

    fn token<'b>(&'b self) -> &'b Token {
        let token_stream: &'b (dyn TokenStream + 'a) = self.borrow();
        token_stream.token()
    }

    fn token_mut<'b>(&'b mut self) -> &'b mut Token {
        let token_stream: &'b mut (dyn TokenStream + 'a) = self.borrow_mut();
        token_stream.token_mut()
    }
}

/// `TokenStream` is the result of the analysis of one field value.
///
/// It consists consumable stream of `Token`s.
pub trait TokenStream {
    /// Advance to the next token
    ///
    /// Returns false if there are no other tokens.
    fn advance(&mut self) -> bool;

    /// Returns a reference to the current token.
    fn token(&self) -> &Token;

    /// Returns a mutable reference to the current token.
    fn token_mut(&mut self) -> &mut Token;

    /// Helper to iterate over tokens. It
    /// simply combines a call to `.advance()`
    /// and `.token()`.
    fn next(&mut self) -> Option<&Token> {
        if self.advance() {
            Some(self.token())
        } else {
            None
        }
    }

    /// Helper function to consume the entire `TokenStream`
    /// and push the tokens to a sink function.
    fn process(&mut self, sink: &mut dyn FnMut(&Token)) {
        while self.advance() {
            sink(self.token());
        }
    }
}

/// `TokenStream` over a list of tokens produced ahead of time.
#[derive(Debug, Clone)]
pub struct PreTokenizedStream {
    tokens: Vec<Token>,
    current_token: i64,
}

impl From<Vec<Token>> for PreTokenizedStream {
    fn from(tokens: Vec<Token>) -> PreTokenizedStream {
        PreTokenizedStream {
            tokens,
            current_token: -1,
        }
    }
}

impl TokenStream for PreTokenizedStream {
    fn advance(&mut self) -> bool {
        self.current_token += 1;
        self.current_token < self.tokens.len() as i64
    }

    fn token(&self) -> &Token {
        assert!(
            self.current_token >= 0,
            "TokenStream not initialized. You should call advance() at least once."
        );
        &self.tokens[self.current_token as usize]
    }

    fn token_mut(&mut self) -> &mut Token {
        assert!(
            self.current_token >= 0,
            "TokenStream not initialized. You should call advance() at least once."
        );
        &mut self.tokens[self.current_token as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_defaults() {
        let token = Token::new("abc", 2, 5);
        assert_eq!(token.term, b"abc".to_vec());
        assert_eq!(token.position_increment, 1);
        assert_eq!(token.term_freq, 1);
        assert!(token.payload.is_none());
        let token = token.with_payload(vec![1u8]).with_position_increment(0);
        assert_eq!(token.payload.as_deref(), Some(&[1u8][..]));
        assert_eq!(token.position_increment, 0);
    }

    #[test]
    fn test_pre_tokenized_stream() {
        let tokens = vec![Token::new("a", 0, 1), Token::new("b", 2, 3)];
        let mut stream: BoxTokenStream = PreTokenizedStream::from(tokens).into();
        let mut terms = Vec::new();
        stream.process(&mut |token| terms.push(token.term.clone()));
        assert_eq!(terms, vec![b"a".to_vec(), b"b".to_vec()]);
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_token_serde() {
        let token = Token::new("x", 0, 1).with_term_freq(3);
        let json = serde_json::to_string(&token).unwrap();
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
