//! Arithmetic over numbers, `+ - * /`, unary signs and parentheses.
//!
//! Input is tokenized and parsed by recursive descent; anything outside that
//! grammar is rejected before evaluation.
//!
//! ```text
//! expr   := term (('+' | '-') term)*
//! term   := factor (('*' | '/') factor)*
//! factor := ('+' | '-') factor | number | '(' expr ')'
//! ```

use crate::executor::{ToolDef, ToolError, ToolExecutor, ToolOutput, extract_fenced_blocks};

const MAX_INPUT_LEN: usize = 1024;
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    #[error("empty expression")]
    Empty,
    #[error("expression longer than {MAX_INPUT_LEN} characters")]
    TooLong,
    #[error("unexpected character {ch:?} at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("unexpected {found} at position {pos}")]
    UnexpectedToken { found: String, pos: usize },
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unbalanced parentheses")]
    UnbalancedParens,
    #[error("nesting deeper than {MAX_DEPTH} levels")]
    TooDeep,
    #[error("division by zero")]
    DivisionByZero,
    #[error("result is not a finite number")]
    NonFinite,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

impl Token {
    fn describe(self) -> String {
        match self {
            Self::Num(n) => format!("number {n}"),
            Self::Plus => "'+'".into(),
            Self::Minus => "'-'".into(),
            Self::Star => "'*'".into(),
            Self::Slash => "'/'".into(),
            Self::LParen => "'('".into(),
            Self::RParen => "')'".into(),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<(Token, usize)>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let token = match ch {
            c if c.is_whitespace() => {
                i += 1;
                continue;
            }
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' | '×' => Token::Star,
            '/' | '÷' => Token::Slash,
            '(' => Token::LParen,
            ')' => Token::RParen,
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && matches!(chars[i], '0'..='9' | '.' | '_' | ',') {
                    i += 1;
                }
                let raw: String = chars[start..i].iter().collect();
                if raw.contains(',') && !is_thousands_grouped(&raw) {
                    return Err(CalcError::InvalidNumber(raw));
                }
                let cleaned: String = raw.chars().filter(|c| *c != '_' && *c != ',').collect();
                let value = cleaned
                    .parse::<f64>()
                    .map_err(|_| CalcError::InvalidNumber(raw.clone()))?;
                tokens.push((Token::Num(value), start));
                continue;
            }
            _ => return Err(CalcError::UnexpectedChar { ch, pos: i }),
        };
        tokens.push((token, i));
        i += 1;
    }
    Ok(tokens)
}

/// `1,234,567.5`: commas only between groups of three integer digits.
fn is_thousands_grouped(raw: &str) -> bool {
    let int_part = raw.split_once('.').map_or(raw, |(int, frac)| {
        if frac.contains(',') { "" } else { int }
    });
    let mut groups = int_part.split(',');
    let Some(head) = groups.next() else {
        return false;
    };
    (1..=3).contains(&head.len())
        && head.bytes().all(|b| b.is_ascii_digit())
        && groups.all(|g| g.len() == 3 && g.bytes().all(|b| b.is_ascii_digit()))
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).map(|(t, _)| *t)
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(CalcError::TooDeep);
        }
        Ok(())
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus {
                value + rhs
            } else {
                value - rhs
            };
        }
        Ok(value)
    }

    #[allow(clippy::float_cmp)]
    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.factor()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.factor()?;
            value = if op == Token::Star {
                value * rhs
            } else {
                if rhs == 0.0 {
                    return Err(CalcError::DivisionByZero);
                }
                value / rhs
            };
        }
        Ok(value)
    }

    fn factor(&mut self) -> Result<f64, CalcError> {
        self.descend()?;
        let value = match self.advance() {
            Some(Token::Num(n)) => n,
            Some(Token::Minus) => -self.factor()?,
            Some(Token::Plus) => self.factor()?,
            Some(Token::LParen) => {
                let inner = self.expr()?;
                match self.advance() {
                    Some(Token::RParen) => inner,
                    _ => return Err(CalcError::UnbalancedParens),
                }
            }
            Some(Token::RParen) => return Err(CalcError::UnbalancedParens),
            Some(other) => {
                return Err(CalcError::UnexpectedToken {
                    found: other.describe(),
                    pos: self.tokens[self.pos - 1].1,
                });
            }
            None => return Err(CalcError::UnexpectedEnd),
        };
        self.depth -= 1;
        Ok(value)
    }
}

/// Evaluate an arithmetic expression.
///
/// # Errors
///
/// Returns [`CalcError`] for anything outside the grammar, division by zero, or a
/// non-finite result.
pub fn evaluate(input: &str) -> Result<f64, CalcError> {
    if input.chars().count() > MAX_INPUT_LEN {
        return Err(CalcError::TooLong);
    }
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(CalcError::Empty);
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;

    if let Some((token, pos)) = parser.tokens.get(parser.pos) {
        return Err(match token {
            Token::RParen => CalcError::UnbalancedParens,
            other => CalcError::UnexpectedToken {
                found: other.describe(),
                pos: *pos,
            },
        });
    }
    if !value.is_finite() {
        return Err(CalcError::NonFinite);
    }
    Ok(value)
}

/// Render a result without a trailing `.0` for integral values.
#[must_use]
#[allow(clippy::float_cmp)]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let s = format!("{value:.10}");
        s.trim_end_matches('0').trim_end_matches('.').to_owned()
    }
}

/// Evaluates ```` ```calc ```` blocks, one expression per line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Calculator;

impl Calculator {
    /// Evaluate a single expression and format the result.
    ///
    /// # Errors
    ///
    /// See [`evaluate`].
    pub fn calculate(&self, expression: &str) -> Result<String, ToolError> {
        Ok(format_number(evaluate(expression)?))
    }

    fn run_block(&self, block: &str) -> Vec<String> {
        block
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(|expr| match self.calculate(expr) {
                Ok(v) => format!("{expr} = {v}"),
                Err(e) => {
                    tracing::debug!(expr, error = %e, "calculation rejected");
                    format!("{expr}: error: {e}")
                }
            })
            .collect()
    }
}

impl ToolExecutor for Calculator {
    async fn execute(&self, response: &str) -> Result<Option<ToolOutput>, ToolError> {
        let blocks = extract_fenced_blocks(response, "calc");
        if blocks.is_empty() {
            return Ok(None);
        }
        let lines: Vec<String> = blocks.iter().flat_map(|b| self.run_block(b)).collect();
        #[allow(clippy::cast_possible_truncation)]
        let blocks_executed = blocks.len() as u32;
        Ok(Some(ToolOutput {
            tool_name: "calculator".to_owned(),
            summary: lines.join("\n"),
            blocks_executed,
        }))
    }

    fn tool_definitions(&self) -> Vec<ToolDef> {
        vec![ToolDef {
            id: "calculator",
            description: "Evaluate arithmetic (numbers, + - * /, parentheses), one expression per line.",
            fence: "calc",
        }]
    }
}
