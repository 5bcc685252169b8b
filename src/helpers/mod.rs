//! Small formatting helpers shared by the renderer and page assembler

mod date;
mod html;
mod url;

pub use date::*;
pub use html::*;
pub use url::*;
