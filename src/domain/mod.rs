pub mod batch;
pub mod detail;
pub mod item;
pub mod mode;
pub mod profile;

pub use batch::BatchEnvelope;
pub use detail::{CommentAuthor, CommentNode, LocalMedia, NoteDetail};
pub use item::CollectedItem;
pub use mode::CollectionMode;
pub use profile::{ProfileStats, ProfileSummary};
