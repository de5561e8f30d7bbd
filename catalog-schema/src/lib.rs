pub mod export;
pub mod forms;
pub mod views;

pub use export::{CatalogExport, ExportCategory, ExportItem};
pub use forms::{CategoryForm, ItemForm, LoginForm, RegisterForm};
pub use views::{
    CategoryPage, CategoryView, FormView, IndexPage, ItemPage, ItemView, LoginPage, UserView,
};
