pub mod constants;
pub(crate) mod error;
mod line_framer;
mod message;

pub use line_framer::LineFramer;
pub use message::Message;
