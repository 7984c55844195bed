use std::fmt;

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::Zero;

use super::EvalError;

/// Bit width of the shift performed by [`Operator::ShiftXor`].
pub const SHIFT_XOR_BITS: usize = 13;

/// Binary operators understood by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `//`, division rounding toward negative infinity.
    FloorDivide,
    /// `<<^`, shift the left operand by [`SHIFT_XOR_BITS`] then xor the right one.
    ShiftXor,
}

impl Operator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Add => "+",
            Operator::Subtract => "-",
            Operator::Multiply => "*",
            Operator::FloorDivide => "//",
            Operator::ShiftXor => "<<^",
        }
    }

    /// Applies the operator to `lhs` (pushed first) and `rhs` (pushed second).
    pub fn apply(&self, lhs: BigInt, rhs: BigInt) -> Result<BigInt, EvalError> {
        let value = match self {
            Operator::Add => lhs + rhs,
            Operator::Subtract => lhs - rhs,
            Operator::Multiply => lhs * rhs,
            Operator::FloorDivide => {
                if rhs.is_zero() {
                    return Err(EvalError::DivisionByZero);
                }
                lhs.div_floor(&rhs)
            }
            Operator::ShiftXor => (lhs << SHIFT_XOR_BITS) ^ rhs,
        };
        Ok(value)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Open,
    Close,
    Operator(Operator),
    Integer(BigInt),
}

impl Token {
    /// Classifies a single word. Words that are neither grouping symbols,
    /// operators nor integer literals yield `None`.
    pub fn classify(word: &str) -> Option<Token> {
        let token = match word {
            "(" => Token::Open,
            ")" => Token::Close,
            "+" => Token::Operator(Operator::Add),
            "-" => Token::Operator(Operator::Subtract),
            "*" => Token::Operator(Operator::Multiply),
            "//" => Token::Operator(Operator::FloorDivide),
            "<<^" => Token::Operator(Operator::ShiftXor),
            s if is_integer_literal(s) => Token::Integer(s.parse().ok()?),
            _ => return None,
        };
        Some(token)
    }
}

/// A literal is one optional leading `-` followed by at least one ASCII digit.
fn is_integer_literal(word: &str) -> bool {
    let digits = word.strip_prefix('-').unwrap_or(word);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

/// Splits `input` into tokens.
///
/// Words are separated by whitespace. Parentheses glued to a word are peeled
/// off, so `(2` becomes `(` followed by `2`. Unrecognized words are dropped.
pub fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();

    for word in input.split_whitespace() {
        let mut rest = word;
        while let Some(stripped) = rest.strip_prefix('(') {
            tokens.push(Token::Open);
            rest = stripped;
        }

        let body = rest.trim_end_matches(')');
        let closes = rest.len() - body.len();

        if let Some(token) = Token::classify(body) {
            tokens.push(token);
        }
        tokens.extend(std::iter::repeat_n(Token::Close, closes));
    }

    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Token {
        Token::Integer(BigInt::from(v))
    }

    #[test]
    fn classify_words() {
        let inputs = vec![
            ("(", Some(Token::Open)),
            (")", Some(Token::Close)),
            ("-", Some(Token::Operator(Operator::Subtract))),
            ("//", Some(Token::Operator(Operator::FloorDivide))),
            ("<<^", Some(Token::Operator(Operator::ShiftXor))),
            ("42", Some(int(42))),
            ("-5", Some(int(-5))),
            ("--5", None),
            ("+5", None),
            ("4a", None),
            ("/", None),
            ("", None),
        ];

        for (word, expected) in inputs {
            assert_eq!(Token::classify(word), expected, "word {word:?}");
        }
    }

    #[test]
    fn tokenize_spaced_expression() {
        let tokens = tokenize("( ( 3 + 4 ) * 2 )");
        assert_eq!(
            tokens,
            vec![
                Token::Open,
                Token::Open,
                int(3),
                Token::Operator(Operator::Add),
                int(4),
                Token::Close,
                Token::Operator(Operator::Multiply),
                int(2),
                Token::Close,
            ]
        );
    }

    #[test]
    fn tokenize_peels_glued_parentheses() {
        assert_eq!(tokenize("((1 - -2))"), tokenize("( ( 1 - -2 ) )"));
    }

    #[test]
    fn tokenize_drops_garbage() {
        let tokens = tokenize("( x 1 + @@ 2 )\n");
        assert_eq!(
            tokens,
            vec![
                Token::Open,
                int(1),
                Token::Operator(Operator::Add),
                int(2),
                Token::Close,
            ]
        );
    }

    #[test]
    fn floor_divide_rounds_down() {
        let apply = |a: i64, b: i64| {
            Operator::FloorDivide
                .apply(BigInt::from(a), BigInt::from(b))
                .unwrap()
        };

        assert_eq!(apply(7, 2), BigInt::from(3));
        assert_eq!(apply(-7, 2), BigInt::from(-4));
        assert_eq!(apply(7, -2), BigInt::from(-4));
        assert_eq!(apply(-7, -2), BigInt::from(3));
    }

    #[test]
    fn floor_divide_by_zero_faults() {
        let res = Operator::FloorDivide.apply(BigInt::from(1), BigInt::zero());
        assert_eq!(res, Err(EvalError::DivisionByZero));
    }

    #[test]
    fn shift_xor_uses_twos_complement() {
        let res = Operator::ShiftXor
            .apply(BigInt::from(-1), BigInt::from(3))
            .unwrap();
        assert_eq!(res, BigInt::from((-1i64 << 13) ^ 3));
    }
}
