//! Translation catalogs: the master `.pot` and one `.po` per locale.

pub mod error;
pub mod friendly;
pub mod load;
pub mod merge;
pub mod model;
pub mod quote;
pub mod save;
pub mod set;

pub use error::CatalogError;
pub use friendly::friendly_name;
pub use load::{
    load,
    parse,
};
pub use merge::{
    MasterCatalog,
    merge_locale,
};
pub use model::{
    Catalog,
    NOT_USED,
    Record,
    canonicalize,
};
pub use set::CatalogSet;
