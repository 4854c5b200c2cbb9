pub mod client;
pub mod error;
pub mod images;
mod retry;
pub mod types;

pub use client::PrestashopClient;
pub use error::SourceError;
pub use images::ImageDeclination;
pub use types::{
    IdRef, RawCategory, RawCombination, RawOption, RawOptionValue, RawProduct, RawStockAvailable,
    StockRef, TextValue,
};
