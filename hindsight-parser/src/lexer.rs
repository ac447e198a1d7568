//! Lexer for the PCTL property grammar using logos

use std::fmt;

use logos::Logos;

use crate::error::ParseError;

/// Token set of the property grammar.
///
/// Operator mnemonics (`EY`, `AP`, …) and the path/since letters (`A`, `E`,
/// `S`) are reserved words: logos prefers the longer identifier match, so
/// `EYE` lexes as a proposition while `EY` stays an operator.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("&")]
    And,

    #[token("|")]
    Or,

    #[token("!")]
    Not,

    #[token("->")]
    Implies,

    #[token("<->")]
    Iff,

    #[token("TRUE")]
    True,

    #[token("FALSE")]
    False,

    #[token("A")]
    AllPaths,

    #[token("E")]
    ExistsPath,

    #[token("S")]
    Since,

    #[token("EY")]
    Ey,

    #[token("AY")]
    Ay,

    #[token("EP")]
    Ep,

    #[token("AP")]
    Ap,

    #[token("EH")]
    Eh,

    #[token("AH")]
    Ah,

    /// Proposition names; primes and dots are allowed as in trace labels.
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_'.]*", |lex| lex.slice().to_string())]
    Ident(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LParen => write!(f, "'('"),
            Token::RParen => write!(f, "')'"),
            Token::And => write!(f, "'&'"),
            Token::Or => write!(f, "'|'"),
            Token::Not => write!(f, "'!'"),
            Token::Implies => write!(f, "'->'"),
            Token::Iff => write!(f, "'<->'"),
            Token::True => write!(f, "TRUE"),
            Token::False => write!(f, "FALSE"),
            Token::AllPaths => write!(f, "'A'"),
            Token::ExistsPath => write!(f, "'E'"),
            Token::Since => write!(f, "'S'"),
            Token::Ey => write!(f, "EY"),
            Token::Ay => write!(f, "AY"),
            Token::Ep => write!(f, "EP"),
            Token::Ap => write!(f, "AP"),
            Token::Eh => write!(f, "EH"),
            Token::Ah => write!(f, "AH"),
            Token::Ident(name) => write!(f, "'{name}'"),
        }
    }
}

/// Tokenize a property, attaching byte positions for diagnostics.
pub fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, ParseError> {
    let mut lexer = Token::lexer(source);
    let mut tokens = Vec::new();
    while let Some(result) = lexer.next() {
        let span = lexer.span();
        match result {
            Ok(token) => tokens.push((token, span.start)),
            Err(()) => {
                let character = source[span.start..].chars().next().unwrap_or('?');
                return Err(ParseError::IllegalCharacter {
                    character,
                    position: span.start,
                });
            }
        }
    }
    Ok(tokens)
}
