//! Recursive descent parser for PCTL properties
//!
//! Binding strength, loosest to tightest: `<->`, `->`, `|`, `&`, then the
//! unary operators (`!` and the temporal mnemonics). All binary connectives
//! associate to the left. `A(phi S psi)` / `E(phi S psi)` are self-delimiting.

use hindsight_core::ast::Formula;

use crate::error::ParseError;
use crate::lexer::{tokenize, Token};

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    const MAX_DEPTH: usize = 512;

    pub fn new(source: &str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            depth: 0,
        })
    }

    /// Parse a complete property; trailing tokens are an error.
    pub fn parse(mut self) -> ParseResult<Formula> {
        let formula = self.parse_iff()?;
        match self.peek() {
            None => Ok(formula),
            Some((token, position)) => Err(ParseError::UnexpectedToken {
                position: *position,
                expected: "end of input".to_string(),
                found: token.to_string(),
            }),
        }
    }

    fn parse_iff(&mut self) -> ParseResult<Formula> {
        let mut lhs = self.parse_implies()?;
        while self.eat(&Token::Iff) {
            let rhs = self.parse_implies()?;
            lhs = Formula::Iff(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_implies(&mut self) -> ParseResult<Formula> {
        let mut lhs = self.parse_or()?;
        while self.eat(&Token::Implies) {
            let rhs = self.parse_or()?;
            lhs = Formula::Implies(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_or(&mut self) -> ParseResult<Formula> {
        let mut lhs = self.parse_and()?;
        while self.eat(&Token::Or) {
            let rhs = self.parse_and()?;
            lhs = Formula::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> ParseResult<Formula> {
        let mut lhs = self.parse_unary()?;
        while self.eat(&Token::And) {
            let rhs = self.parse_unary()?;
            lhs = Formula::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> ParseResult<Formula> {
        self.enter()?;
        let result = self.parse_unary_inner();
        self.depth -= 1;
        result
    }

    fn parse_unary_inner(&mut self) -> ParseResult<Formula> {
        let (token, position) = self
            .next()
            .ok_or_else(|| ParseError::UnexpectedEof {
                expected: "a formula".to_string(),
            })?;
        match token {
            Token::Not => Ok(Formula::Not(Box::new(self.parse_unary()?))),
            Token::Ey => Ok(Formula::Ey(Box::new(self.parse_unary()?))),
            Token::Ay => Ok(Formula::Ay(Box::new(self.parse_unary()?))),
            Token::Ep => Ok(Formula::Ep(Box::new(self.parse_unary()?))),
            Token::Ap => Ok(Formula::Ap(Box::new(self.parse_unary()?))),
            Token::Eh => Ok(Formula::Eh(Box::new(self.parse_unary()?))),
            Token::Ah => Ok(Formula::Ah(Box::new(self.parse_unary()?))),
            Token::AllPaths => {
                let (lhs, rhs) = self.parse_since_body()?;
                Ok(Formula::As(Box::new(lhs), Box::new(rhs)))
            }
            Token::ExistsPath => {
                let (lhs, rhs) = self.parse_since_body()?;
                Ok(Formula::Es(Box::new(lhs), Box::new(rhs)))
            }
            Token::LParen => {
                let inner = self.parse_iff()?;
                self.expect(Token::RParen)?;
                Ok(Formula::Paren(Box::new(inner)))
            }
            Token::True => Ok(Formula::Constant(true)),
            Token::False => Ok(Formula::Constant(false)),
            Token::Ident(name) => Ok(Formula::Proposition(name)),
            other => Err(ParseError::UnexpectedToken {
                position,
                expected: "a formula".to_string(),
                found: other.to_string(),
            }),
        }
    }

    /// `( formula S formula )` after an `A` or `E` head.
    fn parse_since_body(&mut self) -> ParseResult<(Formula, Formula)> {
        self.expect(Token::LParen)?;
        let lhs = self.parse_iff()?;
        self.expect(Token::Since)?;
        let rhs = self.parse_iff()?;
        self.expect(Token::RParen)?;
        Ok((lhs, rhs))
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.depth += 1;
        if self.depth > Self::MAX_DEPTH {
            return Err(ParseError::MaxDepthExceeded {
                depth: self.depth,
                max_depth: Self::MAX_DEPTH,
            });
        }
        Ok(())
    }

    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let item = self.tokens.get(self.pos).cloned();
        if item.is_some() {
            self.pos += 1;
        }
        item
    }

    fn eat(&mut self, token: &Token) -> bool {
        if matches!(self.peek(), Some((found, _)) if found == token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> ParseResult<()> {
        match self.next() {
            Some((found, _)) if found == token => Ok(()),
            Some((found, position)) => Err(ParseError::UnexpectedToken {
                position,
                expected: token.to_string(),
                found: found.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof {
                expected: token.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use pretty_assertions::assert_eq;

    fn roundtrip(source: &str) -> String {
        parse(source).unwrap().to_string()
    }

    #[test]
    fn parses_propositions_and_constants() {
        assert_eq!(roundtrip("p"), "p");
        assert_eq!(roundtrip("TRUE"), "TRUE");
        assert_eq!(roundtrip("FALSE"), "FALSE");
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let formula = parse("p & q | r").unwrap();
        assert_eq!(
            formula,
            Formula::Or(
                Box::new(Formula::And(
                    Box::new(Formula::Proposition("p".into())),
                    Box::new(Formula::Proposition("q".into())),
                )),
                Box::new(Formula::Proposition("r".into())),
            )
        );
    }

    #[test]
    fn implication_is_looser_than_or_and_left_associative() {
        assert_eq!(roundtrip("p -> q -> r"), "p -> q -> r");
        let formula = parse("p -> q -> r").unwrap();
        match formula {
            Formula::Implies(lhs, _) => assert!(matches!(*lhs, Formula::Implies(_, _))),
            other => panic!("expected implication, got {other:?}"),
        }
        let formula = parse("p | q -> r").unwrap();
        assert!(matches!(formula, Formula::Implies(_, _)));
    }

    #[test]
    fn iff_is_the_loosest_connective() {
        let formula = parse("p <-> q -> r").unwrap();
        assert!(matches!(formula, Formula::Iff(_, _)));
    }

    #[test]
    fn unary_operators_take_tight_operands() {
        // `EP p & q` is `(EP p) & q`, matching the reference precedence.
        let formula = parse("EP p & q").unwrap();
        assert_eq!(
            formula,
            Formula::And(
                Box::new(Formula::Ep(Box::new(Formula::Proposition("p".into())))),
                Box::new(Formula::Proposition("q".into())),
            )
        );
    }

    #[test]
    fn parenthesized_operand_keeps_its_parens() {
        let formula = parse("EP(p)").unwrap();
        assert_eq!(formula.to_string(), "EP((p))");
        assert_eq!(
            formula,
            Formula::Ep(Box::new(Formula::Paren(Box::new(Formula::Proposition(
                "p".into()
            )))))
        );
    }

    #[test]
    fn parses_since_forms() {
        assert_eq!(roundtrip("A(p S q)"), "A(p S q)");
        assert_eq!(roundtrip("E(p & q S r)"), "E(p & q S r)");
        let formula = parse("A(p S q)").unwrap();
        assert!(matches!(formula, Formula::As(_, _)));
    }

    #[test]
    fn parses_nested_temporal_formulas() {
        assert_eq!(roundtrip("AH(EP(p) -> EY(q))"), "AH((EP((p)) -> EY((q))))");
        assert_eq!(roundtrip("EP(EP(EP(p)))"), "EP((EP((EP((p))))))");
        assert_eq!(roundtrip("!!p"), "! ! p");
    }

    #[test]
    fn rejects_trailing_input() {
        let err = parse("p q").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn rejects_missing_since_operator() {
        assert!(parse("A(p q)").is_err());
        assert!(parse("A(p S q").is_err());
    }

    #[test]
    fn rejects_empty_input() {
        assert!(matches!(parse(""), Err(ParseError::UnexpectedEof { .. })));
    }

    #[test]
    fn rejects_dangling_operators() {
        assert!(parse("p &").is_err());
        assert!(parse("-> q").is_err());
        assert!(parse("EP").is_err());
    }
}
