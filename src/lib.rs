//! # geode
//!
//! Expands a bracket-driven shorthand into plain Ruby source.
//!
//! The [`parser`] lexes input with a pest grammar, and the [`processor`]
//! walks the token stream recursively, rewriting each bracket group as soon
//! as its closer is found:
//!
//! | shorthand             | output                                                       |
//! |-----------------------|--------------------------------------------------------------|
//! | `(.upcase)`           | `{\|it\|it.upcase}`                                          |
//! | `(&:to_s)`            | `{\|it\|it.to_s}`                                            |
//! | `(x -> x++)`          | `{\|x\|x.succ}`                                              |
//! | `{len}`               | `{\|it\|it.respond_to?(:"len") ? it.send(:"len") : len(it)}` |
//! | `{acc -> acc + it}`   | `{\|it, acc\|acc + it}`                                      |
//! | `\a[1 2 3]`           | `[1, 2, 3]`                                                  |
//! | `\h{["a",1] ["b",2]}` | `[["a",1], ["b",2]].to_h`                                    |

pub mod ast;
pub mod error;
pub mod parser;
pub mod processor;
pub mod runner;

pub use error::{ExpandError, Result};
pub use parser::{ShorthandParser, TokenStream};
pub use processor::{Expander, ExpandingReader};

/// Expand shorthand source with the default expander
pub fn expand(input: &str) -> Result<String> {
    Expander::new().expand(input)
}
