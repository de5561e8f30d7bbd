pub mod guards;
pub mod router;
pub mod routes;

pub use router::{CatalogState, catalog_router};
