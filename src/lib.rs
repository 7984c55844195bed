pub mod connection;
pub mod expression;
pub mod protocol;

pub use expression::{EvalError, evaluate};
pub use protocol::{Farewell, Session, SessionError};
