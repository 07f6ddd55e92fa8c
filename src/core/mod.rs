/*!
Index access: segment readers bundling every per-segment structure,
and the searcher orchestrating query execution over them.
*/

pub mod index;
pub mod searcher;
pub mod segment_reader;

pub use self::index::{Index, SegmentMeta};
pub use self::searcher::Searcher;
pub use self::segment_reader::SegmentReader;
