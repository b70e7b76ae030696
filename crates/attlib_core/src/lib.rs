pub mod consts;
pub mod errors;
pub mod utils;
pub mod config;
pub mod hash;
pub mod page;
pub mod builder;
pub mod pointers;
pub mod stream;
pub mod index;
pub mod definition;
pub mod binding;
pub mod noun;
pub mod syntax;
pub mod cache;
pub mod value;
pub mod session;

pub use consts::SegmentKind;
pub use errors::{AttlibError, Result};
pub use config::{IndexLocation, LayoutConfig, PointerUnit, SegmentSlots, SessionConfig};
pub use hash::{decode, encode, HashValue};
pub use page::{Page, PageStore};
pub use builder::ImageBuilder;
pub use pointers::SegmentPointerTable;
pub use stream::{SegmentScan, SegmentStream, StreamOutcome};
pub use index::{IndexEntry, IndexSegment};
pub use definition::{AttrDefinition, DataType, DefaultFlag, DefaultValue, DefinitionSegment};
pub use binding::{Binding, BindingSegment};
pub use noun::{NounIdentityMap, NounKey};
pub use syntax::{SyntaxEntry, SyntaxTable};
pub use cache::{CachedAttr, MetadataCache};
pub use value::{decode_at, decode_value, Value, ValueDecoder};
pub use session::{AttrKey, Attlib};
