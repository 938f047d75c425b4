// src/basic/parser.rs
use super::expression::{BinOp, Node};

/// Tree depth beyond this is refused rather than risking the native stack.
/// Each operator in a flat chain counts as one level, since the chain
/// folds into a left-leaning tree.
pub const MAX_DEPTH: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    InvalidSyntax(String),
    TooDeep(usize),
}

impl From<String> for ParseError {
    fn from(msg: String) -> Self {
        ParseError::InvalidSyntax(msg)
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidSyntax(msg) => write!(f, "Syntax error: {msg}."),
            ParseError::TooDeep(depth) => write!(f, "Expression nests deeper than {depth} levels."),
        }
    }
}

pub fn parse(input: &str) -> Result<Node, ParseError> {
    let mut p = Parser::new(input);
    p.skip_ws();
    if p.eof() {
        return Err(ParseError::InvalidSyntax("empty expression".into()));
    }
    let node = p.parse_conversion()?;
    p.skip_ws();
    if !p.eof() {
        return Err(ParseError::InvalidSyntax(format!(
            "unexpected '{}'",
            p.peek_char().unwrap_or_default()
        )));
    }
    Ok(node)
}

pub struct Parser<'a> {
    s: &'a str,
    i: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { s, i: 0, depth: 0 }
    }

    fn parse_conversion(&mut self) -> Result<Node, ParseError> {
        let node = self.parse_additive()?;
        self.skip_ws();
        if self.consume_keyword("to") {
            self.skip_ws();
            let unit = self.parse_identifier()?;
            return Ok(Node::Convert(Box::new(node), unit));
        }
        Ok(node)
    }

    fn parse_additive(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_term()?;
        let mut chained = 0;
        loop {
            self.skip_ws();
            let op = if self.consume_char('+') {
                BinOp::Add
            } else if self.consume_char('-') {
                BinOp::Sub
            } else {
                break;
            };
            self.descend()?;
            chained += 1;
            let right = self.parse_term()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_term(&mut self) -> Result<Node, ParseError> {
        let mut left = self.parse_unary()?;
        let mut chained = 0;
        loop {
            self.skip_ws();
            let op = if self.consume_char('*') {
                BinOp::Mul
            } else if self.consume_char('/') {
                BinOp::Div
            } else if self.starts_operand() {
                BinOp::Juxtapose
            } else {
                break;
            };
            self.descend()?;
            chained += 1;
            let right = self.parse_unary()?;
            left = Node::Binary(op, Box::new(left), Box::new(right));
        }
        self.depth -= chained;
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Node, ParseError> {
        self.skip_ws();
        self.descend()?;
        let node = if self.consume_char('-') {
            Node::Neg(Box::new(self.parse_unary()?))
        } else if self.consume_char('+') {
            self.parse_unary()?
        } else {
            self.parse_power()?
        };
        self.depth -= 1;
        Ok(node)
    }

    fn parse_power(&mut self) -> Result<Node, ParseError> {
        let base = self.parse_primary()?;
        self.skip_ws();
        if self.consume_char('^') {
            let exponent = self.parse_unary()?;
            return Ok(Node::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn parse_primary(&mut self) -> Result<Node, ParseError> {
        self.skip_ws();
        match self.peek_char() {
            Some('(') => {
                self.i += 1;
                let inner = self.parse_conversion()?;
                self.skip_ws();
                self.expect(')')?;
                Ok(inner)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => Ok(Node::Number(self.parse_number_literal()?)),
            Some(c) if is_ident_start(c) => {
                let name = self.parse_identifier()?;
                self.skip_ws();
                if self.consume_char('(') {
                    let args = self.parse_args()?;
                    self.expect(')')?;
                    return Ok(Node::Call { name, args });
                }
                Ok(Node::Ident(name))
            }
            Some(c) => Err(ParseError::InvalidSyntax(format!("unexpected '{c}'"))),
            None => Err(ParseError::InvalidSyntax("unexpected end of expression".into())),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut out = Vec::new();
        self.skip_ws();
        if self.peek_char() == Some(')') {
            return Ok(out);
        }
        loop {
            out.push(self.parse_conversion()?);
            self.skip_ws();
            if self.consume_char(',') {
                continue;
            }
            break;
        }
        Ok(out)
    }

    fn descend(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::TooDeep(MAX_DEPTH));
        }
        Ok(())
    }

    /// An identifier or parenthesis directly after an operand multiplies it,
    /// as in `10 USD` or `2pi`. The `to` keyword is not an operand.
    fn starts_operand(&self) -> bool {
        match self.peek_char() {
            Some('(') => true,
            Some(c) if is_ident_start(c) => !self.peek_keyword("to"),
            _ => false,
        }
    }

    pub fn parse_identifier(&mut self) -> Result<String, ParseError> {
        let start = self.i;
        if let Some(c) = self.peek_char() {
            if is_ident_start(c) {
                self.i += c.len_utf8();
            }
        }
        while let Some(c) = self.peek_char() {
            if c == '_' || c.is_alphanumeric() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
        if self.i == start {
            return Err(ParseError::InvalidSyntax("identifier expected".into()));
        }
        Ok(self.s[start..self.i].to_string())
    }

    /// Decimal literal with optional fraction and exponent. `2e` stays a
    /// number followed by the identifier `e`.
    pub fn parse_number_literal(&mut self) -> Result<f64, ParseError> {
        let start = self.i;
        self.consume_digits();
        if self.consume_char('.') {
            self.consume_digits();
        }
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let rest = &self.s[self.i + 1..];
            let signed = rest.starts_with(['+', '-']);
            let digits_at = usize::from(signed);
            if rest[digits_at..].starts_with(|c: char| c.is_ascii_digit()) {
                self.i += 1 + digits_at;
                self.consume_digits();
            }
        }
        let s = &self.s[start..self.i];
        if s.is_empty() || s == "." {
            return Err(ParseError::InvalidSyntax("number expected".into()));
        }
        s.parse::<f64>()
            .map_err(|_| ParseError::InvalidSyntax(format!("bad number '{s}'")))
    }

    fn consume_digits(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() {
                self.i += 1;
            } else {
                break;
            }
        }
    }

    pub fn expect(&mut self, c: char) -> Result<(), ParseError> {
        if self.consume_char(c) {
            Ok(())
        } else {
            Err(ParseError::InvalidSyntax(format!("expected '{}'", c)))
        }
    }

    pub fn consume_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.i += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn consume_keyword(&mut self, word: &str) -> bool {
        if self.peek_keyword(word) {
            self.i += word.len();
            true
        } else {
            false
        }
    }

    fn peek_keyword(&self, word: &str) -> bool {
        self.peek_str(word)
            && !self.s[self.i + word.len()..]
                .starts_with(|c: char| c == '_' || c.is_alphanumeric())
    }

    pub fn peek_char(&self) -> Option<char> {
        self.s[self.i..].chars().next()
    }

    pub fn peek_str(&self, lit: &str) -> bool {
        self.s[self.i..].starts_with(lit)
    }

    pub fn skip_ws(&mut self) {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.i += c.len_utf8();
            } else {
                break;
            }
        }
    }

    pub fn eof(&self) -> bool {
        self.i >= self.s.len()
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic() || matches!(c, '€' | '$' | '£' | '¥')
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn num(v: f64) -> Box<Node> {
        Box::new(Node::Number(v))
    }

    #[test]
    fn precedence_and_power_associativity() {
        let node = parse("1 + 2*3^2").unwrap();
        assert_eq!(
            node,
            Node::Binary(
                BinOp::Add,
                num(1.0),
                Box::new(Node::Binary(
                    BinOp::Mul,
                    num(2.0),
                    Box::new(Node::Binary(BinOp::Pow, num(3.0), num(2.0)))
                ))
            )
        );
    }

    #[test]
    fn juxtaposed_unit_and_conversion() {
        let node = parse("10 USD to EUR").unwrap();
        assert_eq!(
            node,
            Node::Convert(
                Box::new(Node::Binary(BinOp::Juxtapose, num(10.0), Box::new(Node::Ident("USD".into())))),
                "EUR".into()
            )
        );
    }

    #[test]
    fn exponent_literal_versus_euler() {
        assert_eq!(parse("2e3").unwrap(), Node::Number(2000.0));
        assert_eq!(
            parse("2e").unwrap(),
            Node::Binary(BinOp::Juxtapose, num(2.0), Box::new(Node::Ident("e".into())))
        );
    }

    #[test]
    fn unicode_identifiers() {
        assert_eq!(parse("π").unwrap(), Node::Ident("π".into()));
        assert_eq!(parse("€").unwrap(), Node::Ident("€".into()));
    }

    #[test]
    fn syntax_errors() {
        assert!(matches!(parse("1 +"), Err(ParseError::InvalidSyntax(_))));
        assert!(matches!(parse("(1"), Err(ParseError::InvalidSyntax(_))));
        assert!(matches!(parse(""), Err(ParseError::InvalidSyntax(_))));
        assert!(matches!(parse("1 ) 2"), Err(ParseError::InvalidSyntax(_))));
    }

    #[test]
    fn deep_nesting_is_refused() {
        let input = format!("{}1{}", "(".repeat(500), ")".repeat(500));
        assert_eq!(parse(&input), Err(ParseError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn long_operator_chains_count_towards_the_depth_limit() {
        let sum = format!("1{}", "+1".repeat(10_000));
        assert_eq!(parse(&sum), Err(ParseError::TooDeep(MAX_DEPTH)));
        let product = format!("2{}", " x".repeat(10_000));
        assert_eq!(parse(&product), Err(ParseError::TooDeep(MAX_DEPTH)));

        let short = format!("1{}", "+1".repeat(100));
        assert!(parse(&short).is_ok());
        let nested = format!("({})*({})", short, short);
        assert!(parse(&nested).is_ok());
    }
}
