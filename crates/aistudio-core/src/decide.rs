use crate::normalize::NormalizedArguments;
use crate::tools::{AI_SEARCH, BROWSER_AGENT, CRAWL, GENERATE_SCHEMA, SCRAPE};
use crate::{Error, Result};
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Markdown,
    Html,
    Screenshot,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "json" => Some(Self::Json),
            "markdown" => Some(Self::Markdown),
            "html" => Some(Self::Html),
            "screenshot" => Some(Self::Screenshot),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Screenshot => "screenshot",
        }
    }

    /// The schema-bearing format.
    pub fn is_structured(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// Extraction application a schema can be generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum App {
    Scrape,
    Crawl,
    BrowserAgent,
}

impl App {
    /// Every name `parse` accepts.
    pub const NAMES: &'static [&'static str] =
        &[SCRAPE, "ai_scraper", CRAWL, "ai_crawler", BROWSER_AGENT];

    /// Accepts the tool names and their legacy aliases.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scrape" | "ai_scraper" => Some(Self::Scrape),
            "crawl" | "ai_crawler" => Some(Self::Crawl),
            "browser_agent" => Some(Self::BrowserAgent),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scrape => SCRAPE,
            Self::Crawl => CRAWL,
            Self::BrowserAgent => BROWSER_AGENT,
        }
    }
}

/// One backend endpoint, each with its own payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendOperation {
    Scrape,
    ScrapeWithDerivedSchema,
    Crawl,
    CrawlWithDerivedSchema,
    Browse,
    BrowseWithDerivedSchema,
    Search,
    GenerateSchema(App),
}

impl BackendOperation {
    pub fn derives_schema(self) -> bool {
        matches!(
            self,
            Self::ScrapeWithDerivedSchema
                | Self::CrawlWithDerivedSchema
                | Self::BrowseWithDerivedSchema
        )
    }

    /// Operation name used in error messages and logs.
    pub fn name(self) -> &'static str {
        match self {
            Self::Scrape | Self::ScrapeWithDerivedSchema => SCRAPE,
            Self::Crawl | Self::CrawlWithDerivedSchema => CRAWL,
            Self::Browse | Self::BrowseWithDerivedSchema => BROWSER_AGENT,
            Self::Search => AI_SEARCH,
            Self::GenerateSchema(_) => GENERATE_SCHEMA,
        }
    }
}

impl fmt::Display for BackendOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GenerateSchema(app) => write!(f, "generate_schema({})", app.as_str()),
            op if op.derives_schema() => write!(f, "{}(derived schema)", op.name()),
            op => f.write_str(op.name()),
        }
    }
}

/// The backend variant chosen for one invocation, with the arguments it will be shaped from.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub operation: BackendOperation,
    pub args: NormalizedArguments,
}

/// True when the caller wants structured output but supplied no schema, so the backend
/// has to derive one from the prompt. Shared by every extraction tool.
pub fn wants_derived_schema(format: OutputFormat, schema: Option<&Value>) -> bool {
    format.is_structured() && schema.map_or(true, Value::is_null)
}

/// Picks the backend operation for a normalized invocation.
pub fn decide(args: NormalizedArguments) -> Result<Selection> {
    let operation = match args.tool() {
        SCRAPE => pick(
            &args,
            BackendOperation::Scrape,
            BackendOperation::ScrapeWithDerivedSchema,
        )?,
        CRAWL => pick(
            &args,
            BackendOperation::Crawl,
            BackendOperation::CrawlWithDerivedSchema,
        )?,
        BROWSER_AGENT => pick(
            &args,
            BackendOperation::Browse,
            BackendOperation::BrowseWithDerivedSchema,
        )?,
        AI_SEARCH => BackendOperation::Search,
        GENERATE_SCHEMA => {
            let app_name = args.text("app_name").unwrap_or_default();
            let app = App::parse(app_name).ok_or_else(|| Error::InvalidToolArgument {
                tool: GENERATE_SCHEMA.to_string(),
                argument: "app_name".to_string(),
                value: app_name.to_string(),
            })?;
            BackendOperation::GenerateSchema(app)
        }
        other => return Err(Error::UnknownTool(other.to_string())),
    };
    Ok(Selection { operation, args })
}

fn pick(
    args: &NormalizedArguments,
    explicit: BackendOperation,
    derived: BackendOperation,
) -> Result<BackendOperation> {
    let format = args
        .text("output_format")
        .and_then(OutputFormat::parse)
        .ok_or_else(|| Error::validation("output_format", "is required"))?;
    Ok(if wants_derived_schema(format, args.get("schema")) {
        derived
    } else {
        explicit
    })
}
