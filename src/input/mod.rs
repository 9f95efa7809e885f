//! Interactive input: stdin line buffering and command parsing

pub mod buffer;
pub mod command;
pub mod stdin;

pub use buffer::LineBuffer;
pub use command::{parse_command, Command, HELP};
pub use stdin::{drain_fd, ReadStatus};
