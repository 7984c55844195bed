use std::io::{Read, Write};

use log::{debug, info, warn};
use thiserror::Error;

use crate::expression::{self, EvalError};

use super::{Message, ProtocolTransport, Tag, TransportError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("EVAL message carries no expression: {0:?}")]
    MissingExpression(String),

    #[error("cannot evaluate '{expression}': {source}")]
    Expression {
        expression: String,
        source: EvalError,
    },
}

/// Final message of a session, received with the `BYE` tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Farewell {
    /// The full line as received, without its newline.
    pub line: String,
    pub payload: Option<String>,
}

/// One conversation with the evaluator service.
///
/// The session never closes `stream`; once [`Session::run`] returns the caller
/// is free to shut it down.
pub struct Session<T: Read + Write> {
    transport: ProtocolTransport<T>,
    token: String,
}

impl<T: Read + Write> Session<T> {
    pub fn new(stream: T, token: impl Into<String>) -> Self {
        Self {
            transport: ProtocolTransport::new(stream),
            token: token.into(),
        }
    }

    /// Greets the service then answers `EVAL` requests until `BYE` arrives.
    pub fn run(mut self) -> Result<Farewell, SessionError> {
        self.send(&Message::hello(&self.token))?;

        loop {
            let line = self.transport.read_line()?;
            debug!("received: {line}");

            let message = match Message::try_from(line.as_str()) {
                Ok(message) => message,
                Err(e) => {
                    debug!("ignoring message: {e}");
                    continue;
                }
            };

            match message.tag {
                Tag::Eval => {
                    let reply = self.answer(&message, &line)?;
                    self.send(&reply)?;
                }
                Tag::Bye => {
                    info!("session finished");
                    return Ok(Farewell {
                        line,
                        payload: message.payload,
                    });
                }
                tag => debug!("ignoring {tag} message"),
            }
        }
    }

    fn answer(&self, message: &Message, line: &str) -> Result<Message, SessionError> {
        let expression = message
            .expression()
            .ok_or_else(|| SessionError::MissingExpression(line.to_string()))?;

        match expression::evaluate(expression) {
            Ok(value) => Ok(Message::status(&value)),
            Err(e) if e.is_fault() => {
                warn!("'{expression}' faulted: {e}");
                Ok(Message::division_error())
            }
            Err(e) => Err(SessionError::Expression {
                expression: expression.to_string(),
                source: e,
            }),
        }
    }

    fn send(&mut self, message: &Message) -> Result<(), SessionError> {
        debug!("sending: {message}");
        self.transport.write_message(message)?;
        Ok(())
    }
}

/// Runs a complete session over `stream`, identifying as `token`.
pub fn run<T: Read + Write>(stream: T, token: &str) -> Result<Farewell, SessionError> {
    Session::new(stream, token).run()
}
