//! Client side of the evaluator service protocol.
//!
//! This module defines the line-oriented protocol spoken with the evaluator
//! service: the message format, the framing used to read and write messages
//! over a byte stream, and the session state machine that drives the
//! exchange.
//!
//! # Overview
//!
//! The client greets the service with `HELLO` and its identity token. The
//! service then sends any number of `EVAL` requests, each carrying one
//! fully-parenthesized expression. The client answers every request with
//! `STATUS <value>`, or with `ERR #DIV/0` if the expression divides by zero.
//! A `BYE` message ends the session; its text is handed back to the caller.
//!
//! # Wire Format
//!
//! - Every message is a single UTF-8 line terminated by exactly one `\n`.
//! - A line is `cs5700spring2022 <TAG>[ <payload>]`.
//! - Lines may arrive fragmented across reads, or several in one read; the
//!   transport reassembles them.
//!
//! Messages with an unknown tag or prefix are skipped without a reply.
//!
//! # Key Components
//!
//! - [`Message`]: A single protocol line, tag plus optional payload.
//! - [`ProtocolTransport`]: Newline framing over any `Read + Write` stream (e.g. TCP, TLS).
//! - [`Session`]: The HELLO/EVAL/BYE state machine.
//!
//! # See Also
//!
//! - [`expression`](crate::expression): Evaluates the payload of `EVAL` messages.
mod message;
mod session;
mod transport;

pub use message::{DIVISION_ERROR, Message, MessageError, PROTOCOL_PREFIX, Tag};
pub use session::{Farewell, Session, SessionError, run};
pub use transport::{ProtocolTransport, READ_CHUNK_SIZE, TransportError};
