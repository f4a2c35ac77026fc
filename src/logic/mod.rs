//! Query-driven logic that sits between the CLI and the data sources.

pub mod session;

pub use session::{DEFAULT_PAGE_SIZE, SearchSession, SearchView, SessionPhase};
