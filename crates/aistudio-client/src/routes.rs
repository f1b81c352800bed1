use aistudio_core::{App, BackendOperation};

/// Path (relative to the API base URL) serving each operation variant.
pub fn path(op: BackendOperation) -> &'static str {
    match op {
        BackendOperation::Scrape => "/scrape",
        BackendOperation::ScrapeWithDerivedSchema => "/scrape/auto-schema",
        BackendOperation::Crawl => "/crawl",
        BackendOperation::CrawlWithDerivedSchema => "/crawl/auto-schema",
        BackendOperation::Browse => "/browser-agent",
        BackendOperation::BrowseWithDerivedSchema => "/browser-agent/auto-schema",
        BackendOperation::Search => "/search",
        BackendOperation::GenerateSchema(App::Scrape) => "/scrape/schema",
        BackendOperation::GenerateSchema(App::Crawl) => "/crawl/schema",
        BackendOperation::GenerateSchema(App::BrowserAgent) => "/browser-agent/schema",
    }
}

/// Joins the base URL and an operation path without doubling or dropping slashes.
pub fn endpoint(api_url: &str, op: BackendOperation) -> String {
    format!("{}{}", api_url.trim_end_matches('/'), path(op))
}
