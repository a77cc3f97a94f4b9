// src/candidate/mod.rs

//! Candidate folders: which paths qualify, what we track per folder, and the
//! shared table holding every record for the process lifetime.

pub mod record;
pub mod table;
pub mod validator;

pub use record::{Candidate, CandidateSnapshot, CandidateState};
pub use table::{CandidateTable, Registration, StateSummary};
pub use validator::CandidateValidator;
