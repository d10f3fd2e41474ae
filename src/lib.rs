#![warn(missing_docs)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]

//! # slang-bindgen - C header to Slang binding generator
//!
//! This library turns the declarations of C headers into Slang declarations:
//! structs, unions, enums, typedefs, function prototypes, constant globals
//! and simple macros. Slang has no unions, so unions become byte overlays
//! with one property per member.
//!
//! Parsing C is left to a [`Frontend`]; the generator only consumes the
//! owned declaration model in [`ast`].

#[cfg(test)]
mod tests;

mod aggregate;
pub mod ast;
mod emitter;
mod frontend;
mod generator;
mod macros;
mod session;
mod template;
mod translator;

use std::path::PathBuf;

#[cfg(feature = "libclang")]
pub use frontend::ClangFrontend;
pub use frontend::{Frontend, InMemoryFrontend, ParseOptions, system_frontend};
pub use generator::BindingGenerator;

/// A possible error that can be encountered in our library.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The C front-end could not parse a header.
    #[error("failed to parse {}: {message}", header.display())]
    Frontend {
        /// The header being parsed.
        header: PathBuf,
        /// What the front-end reported.
        message: String,
    },
    /// Reading input or writing output failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Rendering the output file failed.
    #[error("failed to render bindings")]
    Template(#[from] askama::Error),
    /// A user supplied pattern is not a valid regular expression.
    #[error("invalid pattern")]
    Pattern(#[from] regex::Error),
    /// The requested functionality was not compiled in.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// A type alias for `std::result::Result` that defaults to our error type.
pub type Result<T, E = Error> = std::result::Result<T, E>;
