pub mod money;
pub mod reference;
pub mod taxonomy;
pub mod transaction;

pub use money::Money;
pub use reference::ReferenceEntry;
pub use taxonomy::{Taxonomy, TaxonomyError};
pub use transaction::{MatchStatus, Transaction, TransactionId};
