pub mod walk;

pub use walk::{enumerate_candidates, CandidateFilter};
