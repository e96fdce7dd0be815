pub mod codec;
pub mod connection;
pub mod parser;

pub use codec::{RespCodec, RespFrame};
pub use connection::Connection;
pub use parser::{info_field, Command};
