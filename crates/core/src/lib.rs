pub mod resolver;
pub mod section;
pub mod types;

pub use resolver::{FeaturedResolver, SectionStore};
pub use section::{Section, SectionPolicy, UnknownSection};
