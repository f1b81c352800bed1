//! The tool catalogue exposed to agent hosts.

use crate::decide::App;
use crate::registry::ToolRegistry;
use crate::spec::{ArgType, ArgumentSpec};
use crate::Result;
use serde_json::json;

pub const GENERATE_SCHEMA: &str = "generate_schema";
pub const SCRAPE: &str = "scrape";
pub const CRAWL: &str = "crawl";
pub const BROWSER_AGENT: &str = "browser_agent";
pub const AI_SEARCH: &str = "ai_search";

/// `(legacy tool name, canonical tool name)`.
pub const TOOL_ALIASES: &[(&str, &str)] = &[("ai_scraper", SCRAPE), ("ai_crawler", CRAWL)];

pub const PAGE_FORMATS: &[&str] = &["json", "markdown"];
pub const BROWSER_FORMATS: &[&str] = &["json", "markdown", "html", "screenshot"];

pub const SEARCH_LIMIT_MAX: u64 = 50;
pub const SEARCH_LIMIT_DEFAULT: u64 = 10;

const SCRAPE_DESCRIPTION: &str = "
Fetch a single web page and return its content.

With output_format=markdown (the default) the full page text is returned. With
output_format=json the page is parsed into structured data: pass `schema` (OpenAPI
format) to control the shape, or leave it out and describe what you want in
`user_prompt` so a schema is derived for you.

Set render_javascript=true only for pages that need a browser to render; it is much
slower. Try without it first.
";

const CRAWL_DESCRIPTION: &str = "
Crawl a site starting from `url` and extract content from the pages relevant to
`crawl_prompt`.

output_format=markdown returns page text; output_format=json returns structured data
shaped by `schema` (OpenAPI format) or, when no schema is given, by a schema derived
from the prompts. `parse_prompt` narrows what is extracted from each page.
`return_sources_limit` caps how many pages are returned (use 1 when the answer lives
on a single page). render_javascript=true is slow; use it only when needed.
";

const BROWSER_AGENT_DESCRIPTION: &str = "
Drive a real browser from `url` to accomplish `browse_prompt` (navigate, click, fill
forms, scroll) and return the final result.

output_format is required: markdown (page text with links), html, screenshot (base64
JPEG) or json. For json, pass `schema` (OpenAPI format) or describe the fields in
`parse_prompt` and a schema is derived.
";

const AI_SEARCH_DESCRIPTION: &str = "
Search the web for `query`.

With return_content=true (the default) each result includes its page content as
markdown, so there is no need to scrape the result URLs afterwards; prefer a small
`limit` in that case. render_javascript=true is slow; use it only when asked to.
";

const GENERATE_SCHEMA_DESCRIPTION: &str = "
Generate an OpenAPI-format JSON schema from a natural-language description of the data
to extract. `app_name` selects which extraction tool the schema is for: scrape, crawl
or browser_agent.
";

fn url_arg(description: &'static str) -> ArgumentSpec {
    ArgumentSpec::required("url", ArgType::Url, description)
}

fn schema_arg() -> ArgumentSpec {
    ArgumentSpec::optional(
        "schema",
        ArgType::NullableObject,
        "OpenAPI schema for json output. Leave null to derive one from the prompt.",
    )
    .with_default(json!(null))
}

fn render_arg() -> ArgumentSpec {
    ArgumentSpec::optional(
        "render_javascript",
        ArgType::Boolean,
        "Render the page in a browser before extraction (slow).",
    )
    .with_default(json!(false))
}

fn page_format_arg() -> ArgumentSpec {
    ArgumentSpec::optional(
        "output_format",
        ArgType::Enum(PAGE_FORMATS),
        "json for structured data, markdown for page text.",
    )
    .with_default(json!("markdown"))
}

impl ToolRegistry {
    /// Registry holding the full tool catalogue and its legacy aliases.
    pub fn catalogue() -> Result<Self> {
        let mut r = Self::new();

        r.register(
            GENERATE_SCHEMA,
            vec![
                ArgumentSpec::required(
                    "user_prompt",
                    ArgType::String,
                    "What data the schema should describe.",
                ),
                // Checked against the known applications when the call is dispatched.
                ArgumentSpec::required(
                    "app_name",
                    ArgType::String,
                    "Target tool: scrape, crawl or browser_agent.",
                )
                .suggest(App::NAMES),
            ],
            GENERATE_SCHEMA_DESCRIPTION,
        )?;

        r.register(
            SCRAPE,
            vec![
                url_arg("The page to scrape."),
                page_format_arg(),
                ArgumentSpec::optional(
                    "user_prompt",
                    ArgType::String,
                    "What to extract. Used to derive a schema for json output without `schema`.",
                )
                .renamed_from(&["parse_prompt"]),
                schema_arg(),
                render_arg(),
            ],
            SCRAPE_DESCRIPTION,
        )?;

        r.register(
            CRAWL,
            vec![
                url_arg("Where the crawl starts."),
                ArgumentSpec::required(
                    "crawl_prompt",
                    ArgType::String,
                    "What information to look for across the site.",
                )
                .renamed_from(&["user_prompt"]),
                ArgumentSpec::optional(
                    "parse_prompt",
                    ArgType::String,
                    "What to extract from each matching page.",
                ),
                page_format_arg(),
                schema_arg(),
                render_arg(),
                ArgumentSpec::optional(
                    "return_sources_limit",
                    ArgType::Number {
                        min: Some(1),
                        max: None,
                    },
                    "Maximum number of pages to return.",
                ),
            ],
            CRAWL_DESCRIPTION,
        )?;

        r.register(
            BROWSER_AGENT,
            vec![
                url_arg("Where browsing starts."),
                ArgumentSpec::required(
                    "browse_prompt",
                    ArgType::String,
                    "What the browser agent should accomplish.",
                )
                .renamed_from(&["user_prompt", "task_prompt"]),
                ArgumentSpec::required(
                    "output_format",
                    ArgType::Enum(BROWSER_FORMATS),
                    "json, markdown, html or screenshot (base64 JPEG).",
                ),
                ArgumentSpec::optional(
                    "parse_prompt",
                    ArgType::String,
                    "What to extract from the final page for json output.",
                ),
                schema_arg(),
            ],
            BROWSER_AGENT_DESCRIPTION,
        )?;

        r.register(
            AI_SEARCH,
            vec![
                ArgumentSpec::required("query", ArgType::String, "The search query."),
                ArgumentSpec::optional(
                    "limit",
                    ArgType::Number {
                        min: Some(1),
                        max: Some(SEARCH_LIMIT_MAX),
                    },
                    "Maximum number of results.",
                )
                .with_default(json!(SEARCH_LIMIT_DEFAULT)),
                render_arg(),
                ArgumentSpec::optional(
                    "return_content",
                    ArgType::Boolean,
                    "Include markdown content for each result.",
                )
                .with_default(json!(true)),
            ],
            AI_SEARCH_DESCRIPTION,
        )?;

        for (alias, target) in TOOL_ALIASES {
            r.register_alias(alias, target)?;
        }
        Ok(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_registers_all_tools_and_aliases() {
        let r = ToolRegistry::catalogue().unwrap();
        let names: Vec<&str> = r.tools().map(|t| t.name.as_str()).collect();
        assert_eq!(
            names,
            vec![AI_SEARCH, BROWSER_AGENT, CRAWL, GENERATE_SCHEMA, SCRAPE]
        );
        assert_eq!(r.lookup("ai_scraper").unwrap().name, SCRAPE);
        assert_eq!(r.lookup("ai_crawler").unwrap().name, CRAWL);
    }

    #[test]
    fn browser_agent_output_format_has_no_default() {
        let r = ToolRegistry::catalogue().unwrap();
        let a = r.lookup(BROWSER_AGENT).unwrap().arg("output_format").unwrap();
        assert!(a.required);
        assert!(a.default.is_none());
    }

    #[test]
    fn legacy_prompt_names_point_at_canonical_fields() {
        let r = ToolRegistry::catalogue().unwrap();
        assert_eq!(
            r.lookup(SCRAPE).unwrap().renamed("parse_prompt"),
            Some("user_prompt")
        );
        assert_eq!(
            r.lookup(CRAWL).unwrap().renamed("user_prompt"),
            Some("crawl_prompt")
        );
        assert_eq!(
            r.lookup(BROWSER_AGENT).unwrap().renamed("task_prompt"),
            Some("browse_prompt")
        );
    }

    #[test]
    fn app_name_schema_lists_every_accepted_app() {
        let r = ToolRegistry::catalogue().unwrap();
        let schema = r.lookup(GENERATE_SCHEMA).unwrap().input_schema();
        let listed = &schema["properties"]["app_name"]["enum"];
        assert_eq!(listed, &json!(App::NAMES));
        for name in App::NAMES {
            assert!(App::parse(name).is_some(), "{name} is advertised but rejected");
        }
        assert!(App::parse("ai_search").is_none());
    }
}
