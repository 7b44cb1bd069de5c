pub mod barcode;
pub mod brand;
pub mod catalog;
pub mod product;
pub mod store;

pub use barcode::BarcodeRepository;
pub use brand::BrandRepository;
pub use catalog::CatalogRepository;
pub use product::ProductRepository;
pub use store::StoreRepository;
