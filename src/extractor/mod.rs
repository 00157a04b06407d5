//! # Extractor Module
//!
//! Resolves action arguments from the request. Each parameter is offered to
//! the chain in order and the first extractor that declares itself applicable
//! produces the value. Applications append their own extractors after the
//! built-ins, or start from [`ExtractorChain::empty`] to control the order
//! completely.

mod builtin;
mod core;

pub use self::core::{ExtractorChain, MethodParameterExtractor};
pub use builtin::{
    default_extractors, AttributeExtractor, BodyExtractor, CookieExtractor, HeaderExtractor,
    ParamExtractor, PathExtractor, QueryExtractor,
};
