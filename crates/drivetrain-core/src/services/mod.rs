//! Process-level services shared by the HTTP layer.

mod store;

pub use store::StoreHandle;
