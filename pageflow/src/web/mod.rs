//! Static HTML adapters: fetching, page sources, navigators and asset
//! downloads.
//!
//! These plug the crawl engine into plain HTTP listings. A browser-driven
//! adapter would implement the same [`PageSource`](crate::crawl::PageSource)
//! and [`Navigator`](crate::crawl::Navigator) traits.

mod assets;
mod fetcher;
mod navigator;
mod page;
mod profile;

pub use assets::{download_asset, download_asset_named, download_assets, AssetReport, DEFAULT_ASSET_EXTENSION};
pub use fetcher::{FetchConfig, FetchResult, Fetcher, HttpFetcher};
pub use navigator::{
    LinkNavigator, PaginationSpec, SingleNavigator, TemplateNavigator, WebNavigator, PAGE_PLACEHOLDER,
};
pub use page::HtmlPage;
pub use profile::ScrapeProfile;
