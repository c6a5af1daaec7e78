//! Formula parser
//!
//! A recursive descent parser for spreadsheet formulas with proper operator
//! precedence. Every error carries the offending token and its byte offset
//! in the text that was passed in.

use crate::ast::{BinaryOperator, CellReference, FormulaExpr, RangeReference, UnaryOperator};
use crate::error::{FormulaResult, ParseError};
use paintcalc_core::{CellAddress, CellError, CellRange, Decimal};
use std::str::FromStr;

/// Parse a formula string into an AST
///
/// The leading `=` is optional.
///
/// # Example
/// ```rust
/// use paintcalc_formula::parse_formula;
///
/// let ast = parse_formula("=1+2").unwrap();
/// let ast = parse_formula("SUM(Exterior!A1:A10)").unwrap();
/// let ast = parse_formula("=IF(A1>0,\"Yes\",\"No\")").unwrap();
/// ```
pub fn parse_formula(formula: &str) -> FormulaResult<FormulaExpr> {
    let leading = formula.len() - formula.trim_start().len();
    let trimmed = formula.trim();
    let (body, offset) = match trimmed.strip_prefix('=') {
        Some(body) => (body, leading + 1),
        None => (trimmed, leading),
    };

    if body.trim().is_empty() {
        return Err(ParseError::new("Empty formula", "", offset).into());
    }

    let mut parser = FormulaParser::new(body, offset)?;
    let expr = parser.parse_expression()?;

    // Make sure we consumed all input
    if !matches!(parser.current_token(), Token::Eof) {
        return Err(parser.unexpected("Unexpected token after expression").into());
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Number(Decimal),
    String(String),
    Boolean(bool),
    Error(CellError),

    // Identifiers and references
    Identifier(String), // Function name or defined name
    CellRef(String),    // Cell reference like A1, $A$1
    SheetRef(String),   // Sheet prefix like Rates! or 'Exterior Siding'!

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Colon,
    Comma,
    Semicolon,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBrace,
    RightBrace,

    // End of input
    Eof,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::String(s) => format!("\"{}\"", s),
            Token::Boolean(true) => "TRUE".into(),
            Token::Boolean(false) => "FALSE".into(),
            Token::Error(e) => e.to_string(),
            Token::Identifier(s) | Token::CellRef(s) => s.clone(),
            Token::SheetRef(s) => format!("{}!", s),
            Token::Plus => "+".into(),
            Token::Minus => "-".into(),
            Token::Star => "*".into(),
            Token::Slash => "/".into(),
            Token::Caret => "^".into(),
            Token::Percent => "%".into(),
            Token::Ampersand => "&".into(),
            Token::Equal => "=".into(),
            Token::NotEqual => "<>".into(),
            Token::LessThan => "<".into(),
            Token::LessEqual => "<=".into(),
            Token::GreaterThan => ">".into(),
            Token::GreaterEqual => ">=".into(),
            Token::Colon => ":".into(),
            Token::Comma => ",".into(),
            Token::Semicolon => ";".into(),
            Token::LeftParen => "(".into(),
            Token::RightParen => ")".into(),
            Token::LeftBrace => "{".into(),
            Token::RightBrace => "}".into(),
            Token::Eof => "end of formula".into(),
        }
    }
}

/// Formula parser
struct FormulaParser<'a> {
    input: &'a str,
    /// Offset of `input` within the caller's text
    offset: usize,
    pos: usize,
    current_token: Token,
    /// Start of the current token within `input`
    token_start: usize,
}

impl<'a> FormulaParser<'a> {
    fn new(input: &'a str, offset: usize) -> Result<Self, ParseError> {
        let mut parser = Self {
            input,
            offset,
            pos: 0,
            current_token: Token::Eof,
            token_start: 0,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> Result<(), ParseError> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.current_token = self.scan_token()?;
        Ok(())
    }

    fn scan_token(&mut self) -> Result<Token, ParseError> {
        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '*' => Some(Token::Star),
            '/' => Some(Token::Slash),
            '^' => Some(Token::Caret),
            '%' => Some(Token::Percent),
            '&' => Some(Token::Ampersand),
            ':' => Some(Token::Colon),
            ',' => Some(Token::Comma),
            ';' => Some(Token::Semicolon),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '{' => Some(Token::LeftBrace),
            '}' => Some(Token::RightBrace),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // Two-character operators
        if c == '<' {
            self.advance();
            return Ok(match self.peek_char() {
                Some('=') => {
                    self.advance();
                    Token::LessEqual
                }
                Some('>') => {
                    self.advance();
                    Token::NotEqual
                }
                _ => Token::LessThan,
            });
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::GreaterEqual);
            }
            return Ok(Token::GreaterThan);
        }

        if c == '"' {
            return self.scan_string();
        }

        if c == '\'' {
            return self.scan_quoted_sheet();
        }

        if c.is_ascii_digit() || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())) {
            return self.scan_number();
        }

        if c == '#' {
            return self.scan_error_literal();
        }

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            return Ok(self.scan_identifier_or_ref());
        }

        Err(self.error_here(format!("Unexpected character '{}'", c), c.to_string()))
    }

    fn scan_string(&mut self) -> Result<Token, ParseError> {
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                Some('"') if self.peek_char_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    return Ok(Token::String(s));
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => {
                    let token = &self.input[self.token_start..];
                    return Err(self.error_here("Unterminated string literal", token));
                }
            }
        }
    }

    /// `'Sheet Name'!`, with `''` standing for one apostrophe
    fn scan_quoted_sheet(&mut self) -> Result<Token, ParseError> {
        self.advance(); // Skip opening quote

        let mut name = String::new();
        loop {
            match self.peek_char() {
                Some('\'') if self.peek_char_at(1) == Some('\'') => {
                    name.push('\'');
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    name.push(c);
                    self.advance();
                }
                None => {
                    let token = &self.input[self.token_start..];
                    return Err(self.error_here("Unterminated sheet name", token));
                }
            }
        }

        if self.peek_char() != Some('!') || name.is_empty() {
            let token = &self.input[self.token_start..self.pos];
            return Err(self.error_here("Expected '!' after quoted sheet name", token));
        }
        self.advance();
        Ok(Token::SheetRef(name))
    }

    fn scan_number(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;

        self.skip_digits();
        if self.peek_char() == Some('.') {
            self.advance();
            self.skip_digits();
        }

        // Exponent part, only when digits follow
        if matches!(self.peek_char(), Some('e' | 'E')) {
            let sign = usize::from(matches!(self.peek_char_at(1), Some('+' | '-')));
            if self.peek_char_at(1 + sign).map_or(false, |c| c.is_ascii_digit()) {
                for _ in 0..=sign {
                    self.advance();
                }
                self.skip_digits();
            }
        }

        let text = &self.input[start..self.pos];
        let number = Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .map_err(|_| self.error_here("Number out of range", text))?;
        Ok(Token::Number(number))
    }

    fn scan_error_literal(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        self.advance();
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || matches!(c, '!' | '/' | '?'))
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];
        CellError::parse(text)
            .map(Token::Error)
            .ok_or_else(|| self.error_here("Unknown error literal", text))
    }

    fn scan_identifier_or_ref(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        if self.peek_char() == Some('!') {
            self.advance();
            return Token::SheetRef(text.to_string());
        }

        // TRUE( and FALSE( are function calls
        let next_is_paren = self.peek_char_after_whitespace() == Some('(');
        if !next_is_paren {
            if text.eq_ignore_ascii_case("TRUE") {
                return Token::Boolean(true);
            }
            if text.eq_ignore_ascii_case("FALSE") {
                return Token::Boolean(false);
            }
        }

        // LOG10(100) is a function call, not a cell
        if Self::is_cell_reference(text) && !next_is_paren {
            return Token::CellRef(text.to_string());
        }

        Token::Identifier(text.to_string())
    }

    /// `[$]letters[$]digits`, nothing else
    fn is_cell_reference(text: &str) -> bool {
        let bytes = text.as_bytes();
        let mut i = 0;

        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let letter_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == letter_start {
            return false;
        }
        if bytes.get(i) == Some(&b'$') {
            i += 1;
        }
        let digit_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        i > digit_start && i == bytes.len()
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn peek_char_after_whitespace(&self) -> Option<char> {
        self.input[self.pos..].chars().find(|c| !c.is_whitespace())
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_digits(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, char::is_whitespace) {
            self.advance();
        }
    }

    fn error_here(&self, message: impl Into<String>, token: impl Into<String>) -> ParseError {
        ParseError::new(message, token, self.offset + self.token_start)
    }

    fn unexpected(&self, message: &str) -> ParseError {
        self.error_here(message, self.current_token.describe())
    }

    fn current_token(&self) -> &Token {
        &self.current_token
    }

    fn consume(&mut self) -> Result<Token, ParseError> {
        let token = std::mem::replace(&mut self.current_token, Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.current_token() == expected {
            self.consume()?;
            Ok(())
        } else {
            Err(self.unexpected(&format!("Expected '{}'", expected.describe())))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (lowest to highest):
    // 1. Comparison: =, <>, <, <=, >, >=
    // 2. Concatenation: &
    // 3. Addition/Subtraction: +, -
    // 4. Multiplication/Division: *, /
    // 5. Exponentiation: ^ (right associative)
    // 6. Unary: -, + and postfix %
    // 7. Range: :
    // 8. Primary: literals, references, function calls, parentheses

    fn parse_expression(&mut self) -> Result<FormulaExpr, ParseError> {
        self.parse_comparison()
    }

    fn binary(op: BinaryOperator, left: FormulaExpr, right: FormulaExpr) -> FormulaExpr {
        FormulaExpr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn parse_comparison(&mut self) -> Result<FormulaExpr, ParseError> {
        let mut left = self.parse_concatenation()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_concatenation()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_concatenation(&mut self) -> Result<FormulaExpr, ParseError> {
        let mut left = self.parse_additive()?;

        while matches!(self.current_token(), Token::Ampersand) {
            self.consume()?;
            let right = self.parse_additive()?;
            left = Self::binary(BinaryOperator::Concat, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<FormulaExpr, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_multiplicative()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<FormulaExpr, ParseError> {
        let mut left = self.parse_exponent()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                _ => break,
            };

            self.consume()?;
            let right = self.parse_exponent()?;
            left = Self::binary(op, left, right);
        }

        Ok(left)
    }

    fn parse_exponent(&mut self) -> Result<FormulaExpr, ParseError> {
        let left = self.parse_unary()?;

        if matches!(self.current_token(), Token::Caret) {
            self.consume()?;
            let right = self.parse_exponent()?; // Right associative
            return Ok(Self::binary(BinaryOperator::Power, left, right));
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<FormulaExpr, ParseError> {
        let prefix = match self.current_token() {
            Token::Minus => Some(UnaryOperator::Negate),
            Token::Plus => Some(UnaryOperator::Plus),
            _ => None,
        };
        if let Some(op) = prefix {
            self.consume()?;
            let operand = self.parse_unary()?;
            return Ok(FormulaExpr::UnaryOp {
                op,
                operand: Box::new(operand),
            });
        }

        let mut expr = self.parse_range()?;

        while matches!(self.current_token(), Token::Percent) {
            self.consume()?;
            expr = FormulaExpr::UnaryOp {
                op: UnaryOperator::Percent,
                operand: Box::new(expr),
            };
        }

        Ok(expr)
    }

    fn parse_range(&mut self) -> Result<FormulaExpr, ParseError> {
        let left = self.parse_primary()?;

        if !matches!(self.current_token(), Token::Colon) {
            return Ok(left);
        }

        self.consume()?;
        let right_at = self.token_start;
        let right = self.parse_primary()?;

        match (left, right) {
            (FormulaExpr::CellRef(start), FormulaExpr::CellRef(end)) => {
                // Sheet1!A1:B5 puts the second endpoint on Sheet1 too
                let sheet = match (start.sheet, end.sheet) {
                    (Some(a), Some(b)) if !a.eq_ignore_ascii_case(&b) => {
                        return Err(ParseError::new(
                            "Range endpoints must be on the same sheet",
                            format!("{}!", b),
                            self.offset + right_at,
                        ));
                    }
                    (Some(a), _) => Some(a),
                    (None, b) => b,
                };
                Ok(FormulaExpr::RangeRef(RangeReference {
                    sheet,
                    range: CellRange::new(start.address, end.address),
                }))
            }
            _ => Err(ParseError::new(
                "Range endpoints must be cell references",
                ":",
                self.offset + right_at,
            )),
        }
    }

    fn parse_primary(&mut self) -> Result<FormulaExpr, ParseError> {
        match self.current_token().clone() {
            Token::Number(n) => {
                self.consume()?;
                Ok(FormulaExpr::Number(n))
            }

            Token::String(s) => {
                self.consume()?;
                Ok(FormulaExpr::Text(s))
            }

            Token::Boolean(b) => {
                self.consume()?;
                Ok(FormulaExpr::Boolean(b))
            }

            Token::Error(e) => {
                self.consume()?;
                Ok(FormulaExpr::Error(e))
            }

            Token::LeftParen => {
                self.consume()?;
                let expr = self.parse_expression()?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }

            Token::LeftBrace => self.parse_array(),

            Token::SheetRef(sheet) => {
                self.consume()?;
                match self.current_token().clone() {
                    Token::CellRef(text) => {
                        let at = self.token_start;
                        self.consume()?;
                        self.cell_reference(Some(sheet), &text, at)
                    }
                    _ => Err(self.unexpected("Expected cell reference after sheet name")),
                }
            }

            Token::CellRef(text) => {
                let at = self.token_start;
                self.consume()?;
                self.cell_reference(None, &text, at)
            }

            Token::Identifier(name) => {
                self.consume()?;
                if matches!(self.current_token(), Token::LeftParen) {
                    self.parse_function_call(name)
                } else {
                    Ok(FormulaExpr::NameRef(name))
                }
            }

            _ => Err(self.unexpected("Unexpected token")),
        }
    }

    fn parse_array(&mut self) -> Result<FormulaExpr, ParseError> {
        self.expect(&Token::LeftBrace)?;

        let mut rows = Vec::new();
        let mut current_row = vec![self.parse_expression()?];

        loop {
            match self.current_token() {
                Token::Comma => {
                    self.consume()?;
                    current_row.push(self.parse_expression()?);
                }
                Token::Semicolon => {
                    self.consume()?;
                    rows.push(std::mem::take(&mut current_row));
                    current_row.push(self.parse_expression()?);
                }
                Token::RightBrace => break,
                _ => return Err(self.unexpected("Expected ',' ';' or '}' in array")),
            }
        }
        rows.push(current_row);

        if rows.iter().any(|row| row.len() != rows[0].len()) {
            return Err(self.unexpected("Array rows must have the same length"));
        }

        self.expect(&Token::RightBrace)?;
        Ok(FormulaExpr::Array(rows))
    }

    fn parse_function_call(&mut self, name: String) -> Result<FormulaExpr, ParseError> {
        self.expect(&Token::LeftParen)?;

        let mut args = Vec::new();

        if !matches!(self.current_token(), Token::RightParen) {
            args.push(self.parse_argument()?);

            while matches!(self.current_token(), Token::Comma) {
                self.consume()?;
                args.push(self.parse_argument()?);
            }
        }

        self.expect(&Token::RightParen)?;

        Ok(FormulaExpr::Function {
            name: name.to_uppercase(),
            args,
        })
    }

    /// An argument slot that may be left empty, as in `ROUND(A1,)`
    fn parse_argument(&mut self) -> Result<FormulaExpr, ParseError> {
        if matches!(self.current_token(), Token::Comma | Token::RightParen) {
            return Ok(FormulaExpr::Missing);
        }
        self.parse_expression()
    }

    fn cell_reference(
        &self,
        sheet: Option<String>,
        text: &str,
        at: usize,
    ) -> Result<FormulaExpr, ParseError> {
        let address = CellAddress::parse(text)
            .map_err(|e| ParseError::new(format!("Invalid cell reference: {}", e), text, self.offset + at))?;
        Ok(FormulaExpr::CellRef(CellReference { sheet, address }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FormulaError;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn parse_err(formula: &str) -> ParseError {
        match parse_formula(formula) {
            Err(FormulaError::Parse(e)) => e,
            other => panic!("expected parse error for {formula:?}, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_formula("=42").unwrap(), FormulaExpr::Number(dec!(42)));
        assert_eq!(parse_formula("=3.14").unwrap(), FormulaExpr::Number(dec!(3.14)));
        assert_eq!(parse_formula("=.5").unwrap(), FormulaExpr::Number(dec!(0.5)));
        assert_eq!(parse_formula("=1e3").unwrap(), FormulaExpr::Number(dec!(1000)));
        assert_eq!(parse_formula("=2.5E-2").unwrap(), FormulaExpr::Number(dec!(0.025)));
    }

    #[test]
    fn test_leading_equals_optional() {
        assert_eq!(parse_formula("1+2").unwrap(), parse_formula("=1+2").unwrap());
        assert_eq!(parse_formula("  =A1 ").unwrap(), parse_formula("A1").unwrap());
    }

    #[test]
    fn test_parse_string() {
        assert_eq!(parse_formula("=\"Hello\"").unwrap(), FormulaExpr::Text("Hello".into()));
        assert_eq!(
            parse_formula("=\"Hello \"\"World\"\"\"").unwrap(),
            FormulaExpr::Text("Hello \"World\"".into())
        );
    }

    #[test]
    fn test_parse_boolean() {
        assert_eq!(parse_formula("=TRUE").unwrap(), FormulaExpr::Boolean(true));
        assert_eq!(parse_formula("=false").unwrap(), FormulaExpr::Boolean(false));
        assert!(matches!(parse_formula("=TRUE()").unwrap(), FormulaExpr::Function { .. }));
    }

    #[test]
    fn test_parse_precedence() {
        let ast = parse_formula("=1+2*3").unwrap();
        let FormulaExpr::BinaryOp { op, left, right } = ast else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Add);
        assert_eq!(*left, FormulaExpr::Number(dec!(1)));
        assert!(matches!(*right, FormulaExpr::BinaryOp { op: BinaryOperator::Multiply, .. }));

        // Concatenation binds looser than addition
        let ast = parse_formula("=1+2&\"x\"").unwrap();
        assert!(matches!(ast, FormulaExpr::BinaryOp { op: BinaryOperator::Concat, .. }));

        // Comparison is loosest
        let ast = parse_formula("=A1&\"x\"=\"1x\"").unwrap();
        assert!(matches!(ast, FormulaExpr::BinaryOp { op: BinaryOperator::Equal, .. }));
    }

    #[test]
    fn test_power_is_right_associative() {
        let ast = parse_formula("=2^3^2").unwrap();
        let FormulaExpr::BinaryOp { op, left, right } = ast else {
            panic!("Expected BinaryOp");
        };
        assert_eq!(op, BinaryOperator::Power);
        assert_eq!(*left, FormulaExpr::Number(dec!(2)));
        assert!(matches!(*right, FormulaExpr::BinaryOp { op: BinaryOperator::Power, .. }));
    }

    #[test]
    fn test_parse_unary() {
        let ast = parse_formula("=-5").unwrap();
        assert!(matches!(ast, FormulaExpr::UnaryOp { op: UnaryOperator::Negate, .. }));

        let ast = parse_formula("=+A1").unwrap();
        assert!(matches!(ast, FormulaExpr::UnaryOp { op: UnaryOperator::Plus, .. }));

        let ast = parse_formula("=50%").unwrap();
        assert!(matches!(ast, FormulaExpr::UnaryOp { op: UnaryOperator::Percent, .. }));
    }

    #[test]
    fn test_parse_cell_reference() {
        let FormulaExpr::CellRef(cell_ref) = parse_formula("=A1").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!((cell_ref.address.row, cell_ref.address.col), (0, 0));
        assert!(cell_ref.sheet.is_none());

        let FormulaExpr::CellRef(cell_ref) = parse_formula("=$B$2").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!((cell_ref.address.row, cell_ref.address.col), (1, 1));
        assert!(cell_ref.address.row_absolute);
    }

    #[test]
    fn test_parse_sheet_references() {
        let FormulaExpr::CellRef(cell_ref) = parse_formula("=Rates!B2").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!(cell_ref.sheet.as_deref(), Some("Rates"));

        let FormulaExpr::CellRef(cell_ref) = parse_formula("='Exterior Siding'!C4").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!(cell_ref.sheet.as_deref(), Some("Exterior Siding"));

        let FormulaExpr::CellRef(cell_ref) = parse_formula("='Bob''s Rates'!A1").unwrap() else {
            panic!("Expected CellRef");
        };
        assert_eq!(cell_ref.sheet.as_deref(), Some("Bob's Rates"));
    }

    #[test]
    fn test_parse_range_reference() {
        let FormulaExpr::RangeRef(range_ref) = parse_formula("=B10:A1").unwrap() else {
            panic!("Expected RangeRef");
        };
        assert_eq!(range_ref.range, CellRange::from_indices(0, 0, 9, 1));

        let FormulaExpr::RangeRef(range_ref) = parse_formula("=Rates!A2:C4").unwrap() else {
            panic!("Expected RangeRef");
        };
        assert_eq!(range_ref.sheet.as_deref(), Some("Rates"));
        assert_eq!(range_ref.range.cell_count(), 9);

        assert!(matches!(parse_formula("=Rates!A2:Rates!C4").unwrap(), FormulaExpr::RangeRef(_)));
        assert_eq!(
            parse_err("=Rates!A2:Other!C4").message,
            "Range endpoints must be on the same sheet"
        );
    }

    #[test]
    fn test_parse_function() {
        let FormulaExpr::Function { name, args } = parse_formula("=sum(1,2,3)").unwrap() else {
            panic!("Expected Function");
        };
        assert_eq!(name, "SUM");
        assert_eq!(args.len(), 3);

        let FormulaExpr::Function { name, args } = parse_formula("=LOG10(100)").unwrap() else {
            panic!("Expected Function");
        };
        assert_eq!(name, "LOG10");
        assert_eq!(args, vec![FormulaExpr::Number(dec!(100))]);

        let FormulaExpr::Function { args, .. } = parse_formula("=PI()").unwrap() else {
            panic!("Expected Function");
        };
        assert!(args.is_empty());
    }

    #[test]
    fn test_parse_missing_arguments() {
        let FormulaExpr::Function { args, .. } = parse_formula("=ROUND(A1,)").unwrap() else {
            panic!("Expected Function");
        };
        assert_eq!(args.len(), 2);
        assert_eq!(args[1], FormulaExpr::Missing);

        let FormulaExpr::Function { args, .. } = parse_formula("=IF(,,)").unwrap() else {
            panic!("Expected Function");
        };
        assert_eq!(args, vec![FormulaExpr::Missing; 3]);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_formula("=SidingSqft").unwrap(), FormulaExpr::NameRef("SidingSqft".into()));
        assert_eq!(parse_formula("=rate.base").unwrap(), FormulaExpr::NameRef("rate.base".into()));
    }

    #[test]
    fn test_parse_array() {
        let FormulaExpr::Array(rows) = parse_formula("={1,2,3}").unwrap() else {
            panic!("Expected Array");
        };
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 3);

        let FormulaExpr::Array(rows) = parse_formula("={\"economy\",2.5;\"premium\",5}").unwrap() else {
            panic!("Expected Array");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][1], FormulaExpr::Number(dec!(5)));

        assert!(parse_formula("={1,2;3}").is_err());
    }

    #[test]
    fn test_parse_error_literals() {
        assert_eq!(parse_formula("=#VALUE!").unwrap(), FormulaExpr::Error(CellError::Value));
        assert_eq!(parse_formula("=#DIV/0!").unwrap(), FormulaExpr::Error(CellError::Div0));
        assert_eq!(parse_formula("=#N/A").unwrap(), FormulaExpr::Error(CellError::Na));
        assert_eq!(parse_err("=#BOGUS!").message, "Unknown error literal");
    }

    #[test]
    fn test_error_positions() {
        let err = parse_err("=1+@");
        assert_eq!(err.position, 3);
        assert_eq!(err.token, "@");

        let err = parse_err("=\"open");
        assert_eq!(err.message, "Unterminated string literal");
        assert_eq!(err.position, 1);

        let err = parse_err("=SUM(1,2");
        assert_eq!(err.token, "end of formula");

        let err = parse_err("=1 2");
        assert_eq!(err.position, 3);
        assert_eq!(err.token, "2");

        let err = parse_err("=Rates!");
        assert_eq!(err.message, "Expected cell reference after sheet name");

        assert_eq!(parse_err("=").message, "Empty formula");
        assert_eq!(parse_err("=(1+2").message, "Expected ')'");
    }

    #[test]
    fn test_complex_formula() {
        let ast = parse_formula(
            "=IF(AND(Inputs!B2>0,Inputs!B3<>\"\"),ROUND(Inputs!B2*VLOOKUP(Inputs!B3,Rates!$A$2:$C$4,2,FALSE),2),0)",
        )
        .unwrap();
        assert!(matches!(ast, FormulaExpr::Function { ref name, .. } if name == "IF"));
        assert_eq!(ast.reference_count(), 5);
        assert_eq!(ast.function_names(), vec!["IF", "AND", "ROUND", "VLOOKUP"]);
    }
}
