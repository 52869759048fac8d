pub mod constants;
pub mod mime;
pub mod srcset;
pub mod url_utils;

pub use constants::*;
pub use srcset::{SrcsetCandidate, parse_srcset, rewrite_srcset};
pub use url_utils::{UrlResolver, canonical_key, canonicalize, is_valid_url, parse_absolute};
