//! Turning local track metadata into catalog track ids.

pub mod normalize;
pub mod resolver;
pub mod tie_break;

pub use resolver::{Resolution, TrackQuery, TrackResolver};
pub use tie_break::{FirstCandidate, TieBreak, TieBreakKind};
