//! Linking free-text amendment authors to legislator dimensions.

pub mod normalize;
pub mod representative;
pub mod resolver;

pub use normalize::normalize_name;
pub use representative::{select_representatives, Precedence};
pub use resolver::{Authorship, DimensionColumns, EntityResolver, Legislator, LegislatorIndex};
