use crate::decide::{BackendOperation, Selection};
use crate::normalize::NormalizedArguments;
use serde::Serialize;
use serde_json::Value;

/// Request body for one backend operation variant.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendPayload {
    pub operation: BackendOperation,
    pub body: Value,
}

impl BackendPayload {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

#[derive(Serialize)]
struct ScrapeBody<'a> {
    url: &'a str,
    output_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    openapi_schema: Option<&'a Value>,
    render_html: bool,
}

#[derive(Serialize)]
struct CrawlBody<'a> {
    url: &'a str,
    crawl_prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_prompt: Option<&'a str>,
    output_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    openapi_schema: Option<&'a Value>,
    render_html: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_pages: Option<u64>,
}

#[derive(Serialize)]
struct BrowseBody<'a> {
    url: &'a str,
    browse_prompt: &'a str,
    output_format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    openapi_schema: Option<&'a Value>,
}

#[derive(Serialize)]
struct SearchBody<'a> {
    query: &'a str,
    limit: u64,
    render_javascript: bool,
    return_content: bool,
}

#[derive(Serialize)]
struct GenerateSchemaBody<'a> {
    user_prompt: &'a str,
}

/// Maps a selection onto the exact body its backend variant expects.
///
/// Fields are copied (and possibly renamed) from the normalized arguments or omitted;
/// derived-schema variants never carry `openapi_schema`.
pub fn shape(selection: &Selection) -> BackendPayload {
    let a = &selection.args;
    let op = selection.operation;
    let derived = op.derives_schema();
    let explicit_schema = if derived { None } else { schema(a) };

    let body = match op {
        BackendOperation::Scrape | BackendOperation::ScrapeWithDerivedSchema => {
            to_value(&ScrapeBody {
                url: text(a, "url"),
                output_format: text(a, "output_format"),
                user_prompt: a.text("user_prompt"),
                openapi_schema: explicit_schema,
                render_html: a.flag("render_javascript").unwrap_or(false),
            })
        }
        BackendOperation::Crawl | BackendOperation::CrawlWithDerivedSchema => {
            to_value(&CrawlBody {
                url: text(a, "url"),
                crawl_prompt: text(a, "crawl_prompt"),
                parse_prompt: a.text("parse_prompt"),
                output_format: text(a, "output_format"),
                openapi_schema: explicit_schema,
                render_html: a.flag("render_javascript").unwrap_or(false),
                max_pages: a.number("return_sources_limit"),
            })
        }
        BackendOperation::Browse | BackendOperation::BrowseWithDerivedSchema => {
            // Schema derivation needs something to derive from: the caller's parse
            // prompt, or failing that the browse objective itself.
            let parse_prompt = if derived {
                a.text("parse_prompt").or_else(|| a.text("browse_prompt"))
            } else {
                a.text("parse_prompt")
            };
            to_value(&BrowseBody {
                url: text(a, "url"),
                browse_prompt: text(a, "browse_prompt"),
                output_format: text(a, "output_format"),
                parse_prompt,
                openapi_schema: explicit_schema,
            })
        }
        BackendOperation::Search => to_value(&SearchBody {
            query: text(a, "query"),
            limit: a.number("limit").unwrap_or(crate::tools::SEARCH_LIMIT_DEFAULT),
            render_javascript: a.flag("render_javascript").unwrap_or(false),
            return_content: a.flag("return_content").unwrap_or(true),
        }),
        BackendOperation::GenerateSchema(_) => to_value(&GenerateSchemaBody {
            user_prompt: text(a, "user_prompt"),
        }),
    };

    BackendPayload {
        operation: op,
        body,
    }
}

fn text<'a>(a: &'a NormalizedArguments, name: &str) -> &'a str {
    a.text(name).unwrap_or_default()
}

fn schema(a: &NormalizedArguments) -> Option<&Value> {
    a.get("schema").filter(|v| !v.is_null())
}

fn to_value<T: Serialize>(body: &T) -> Value {
    // Borrowed strings, bools, integers and JSON values only: serialization cannot fail.
    serde_json::to_value(body).unwrap_or(Value::Null)
}
