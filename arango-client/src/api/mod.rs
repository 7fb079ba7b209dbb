//! Database, collection, graph, view and route handles.
//!
//! Every operation builds a request with a function from [`request`] and
//! runs it through the client's [`Executor`](crate::Executor).

mod collection;
mod database;
pub mod entity;
mod graph;
pub mod options;
pub mod request;
mod route;
mod view;

pub use collection::Collection;
pub use database::Database;
pub use graph::Graph;
pub use route::Route;
pub use view::View;
