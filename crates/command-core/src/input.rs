//! Parsing of raw message text into command components.

use thiserror::Error;

/// Errors that can occur while parsing a message into a command.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The message contained no tokens.
    #[error("unable to parse command")]
    Unparsable,
}

/// A tokenized user utterance.
///
/// `name` is the first whitespace-separated token, lowercased; `args` are the
/// remaining tokens in order; `raw` preserves the original text for pattern
/// matching at the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInput {
    pub name: String,
    pub args: Vec<String>,
    pub raw: String,
}

impl UserInput {
    /// Parse a message into command name and argument components.
    ///
    /// Tokenization is plain whitespace splitting. There is no quoting or
    /// escaping; every token after the first is an argument.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let mut tokens = text.split_whitespace();

        let name = tokens.next().ok_or(ParseError::Unparsable)?.to_lowercase();
        let args = tokens.map(str::to_string).collect();

        Ok(Self {
            name,
            args,
            raw: text.to_string(),
        })
    }
}
