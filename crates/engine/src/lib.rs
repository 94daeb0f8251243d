pub mod corpus;
pub mod matcher;
pub mod normalize;
pub mod session;

pub use corpus::{ReferenceCorpus, UpsertOutcome};
pub use matcher::{Classification, Matcher, DEFAULT_FUZZY_THRESHOLD};
pub use normalize::{normalize, token_set_ratio};
pub use session::{
    CategorizationSession, CategoryChoice, CategoryTotal, FileError, FileFailure, IngestSummary,
    SessionError, StatementFile, StatusCounts,
};
