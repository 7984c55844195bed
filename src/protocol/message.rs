use std::fmt;

use num_bigint::BigInt;
use thiserror::Error;

/// Leading word of every line exchanged with the evaluator service.
pub const PROTOCOL_PREFIX: &str = "cs5700spring2022";

/// Payload of the `ERR` message reporting a division by zero.
pub const DIVISION_ERROR: &str = "#DIV/0";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MessageError {
    #[error("empty message")]
    Empty,

    #[error("unexpected message prefix '{0}'")]
    Prefix(String),

    #[error("unknown message tag '{0}'")]
    UnknownTag(String),
}

/// Message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    /// Client greeting carrying the identity token.
    Hello,
    /// Server request to evaluate an expression.
    Eval,
    /// Client reply carrying an evaluation result.
    Status,
    /// Client reply reporting an arithmetic fault.
    Err,
    /// Server termination message.
    Bye,
}

impl Tag {
    pub fn keyword(&self) -> &'static str {
        match self {
            Tag::Hello => "HELLO",
            Tag::Eval => "EVAL",
            Tag::Status => "STATUS",
            Tag::Err => "ERR",
            Tag::Bye => "BYE",
        }
    }
}

impl TryFrom<&str> for Tag {
    type Error = MessageError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "HELLO" => Ok(Tag::Hello),
            "EVAL" => Ok(Tag::Eval),
            "STATUS" => Ok(Tag::Status),
            "ERR" => Ok(Tag::Err),
            "BYE" => Ok(Tag::Bye),
            s => Err(MessageError::UnknownTag(s.to_string())),
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A single protocol line, without its terminating newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub tag: Tag,
    pub payload: Option<String>,
}

impl Message {
    pub fn new(tag: Tag, payload: Option<String>) -> Self {
        Self { tag, payload }
    }

    pub fn hello(token: &str) -> Self {
        Self::new(Tag::Hello, Some(token.to_string()))
    }

    pub fn status(value: &BigInt) -> Self {
        Self::new(Tag::Status, Some(value.to_string()))
    }

    pub fn division_error() -> Self {
        Self::new(Tag::Err, Some(DIVISION_ERROR.to_string()))
    }

    /// Expression text of an `EVAL` payload: everything from the first `(`.
    pub fn expression(&self) -> Option<&str> {
        let payload = self.payload.as_deref()?;
        payload.find('(').map(|start| &payload[start..])
    }
}

impl TryFrom<&str> for Message {
    type Error = MessageError;

    fn try_from(line: &str) -> Result<Self, Self::Error> {
        let line = line.trim_start();
        let (prefix, rest) = line.split_once(' ').unwrap_or((line, ""));

        if prefix.is_empty() {
            return Err(MessageError::Empty);
        }
        if prefix != PROTOCOL_PREFIX {
            return Err(MessageError::Prefix(prefix.to_string()));
        }

        let rest = rest.trim_start();
        let (tag, payload) = match rest.split_once(' ') {
            Some((tag, payload)) => (tag, Some(payload.trim().to_string())),
            None => (rest.trim_end(), None),
        };

        Ok(Message {
            tag: tag.try_into()?,
            payload: payload.filter(|p| !p.is_empty()),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PROTOCOL_PREFIX} {}", self.tag)?;
        if let Some(payload) = &self.payload {
            write!(f, " {payload}")?;
        }
        Ok(())
    }
}
