//! Page access backends: plain HTTP fetches and headless-browser observation.

pub mod browser;
mod http_client;

pub use browser::{BrowserObserver, BrowserObserverConfig};
pub use http_client::{HttpClient, HttpResponse};
