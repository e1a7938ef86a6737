//! Protocol Module
//!
//! Defines the SSDB wire protocol shared by requests and responses.
//!
//! ## Block Format
//! ```text
//! <decimal length>\n<raw bytes>\n      one block
//! \n                                   end of sequence
//! ```
//!
//! ### Request
//! First block is the command name, remaining blocks are its arguments:
//! ```text
//! 3\nget\n4\nuser\n\n
//! ```
//!
//! ### Response
//! First block is the status code, remaining blocks are the payload:
//! ```text
//! 2\nok\n5\nalice\n\n
//! ```
//!
//! ### Status Codes
//! - `ok`: success
//! - `not_found`: key or field does not exist
//! - `error`: server-side failure
//! - `fail`: command could not be applied
//! - `client_error`: malformed or unknown command

mod command;
mod response;
mod codec;

pub use command::{Arg, Command, CommandBuilder};
pub use response::{Response, Status};
pub use codec::{
    decode_blocks, decode_frame, decode_response, encode_blocks, encode_command, encode_into,
    encode_response, MAX_BLOCK_SIZE,
};
