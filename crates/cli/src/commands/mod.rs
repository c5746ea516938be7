pub mod explore;
pub mod handle;
pub mod migration;
pub mod query;
pub mod solve;

pub use explore::ExploreCommand;
pub use handle::{HandleCommand, HandlerKind};
pub use migration::MigrateCommand;
pub use query::QueryCommand;
pub use solve::SolveCommand;
