//! Move documentation files and keep links pointing at them.
//!
//! [`Move`] relocates a markdown file or a directory of markdown files inside
//! a documentation set. Links inside the moved files are recomputed for their
//! new location, and links in every other page that point at the old location
//! are rewritten, keeping `#anchor` fragments.
//!
//! All rewrites are computed in memory before anything is written. A dry run
//! reports the same [`LinkModification`]s without touching the disk.
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use std::path::Path;
//!
//! use folio_mover::Move;
//!
//! let mover = Move::from_files("docs", vec!["index.md".to_owned(), "a/b.md".to_owned()]);
//! let outcome = mover.execute(Path::new("docs/a/b.md"), Path::new("docs/a/c/b.md"), true)?;
//! for change in &outcome.modifications {
//!     println!("{} -> {}", change.old_link, change.new_link);
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod mover;
mod rewrite;

pub use error::MoveError;
pub use mover::{Change, ChangeSet, LinkModification, Move, MoveOutcome, MovePlan};
