use crate::spec::{ArgumentSpec, ToolDefinition};
use crate::{Error, Result};
use std::collections::BTreeMap;

/// Registered tools, keyed by canonical name, plus legacy aliases.
///
/// Built once during startup and shared behind an `Arc`; nothing mutates it afterwards.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolDefinition>,
    aliases: BTreeMap<String, String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        name: &str,
        args: Vec<ArgumentSpec>,
        description: &str,
    ) -> Result<()> {
        if self.is_taken(name) {
            return Err(Error::DuplicateTool(name.to_string()));
        }
        let mut seen = std::collections::BTreeSet::new();
        for a in &args {
            if !seen.insert(a.name) {
                return Err(Error::InvalidDefinition {
                    tool: name.to_string(),
                    reason: format!("argument `{}` declared twice", a.name),
                });
            }
            a.check_default().map_err(|reason| Error::InvalidDefinition {
                tool: name.to_string(),
                reason,
            })?;
        }
        self.tools.insert(
            name.to_string(),
            ToolDefinition {
                name: name.to_string(),
                description: description.trim().to_string(),
                args,
            },
        );
        Ok(())
    }

    pub fn register_alias(&mut self, alias: &str, target: &str) -> Result<()> {
        if self.is_taken(alias) {
            return Err(Error::DuplicateTool(alias.to_string()));
        }
        if !self.tools.contains_key(target) {
            return Err(Error::UnknownTool(target.to_string()));
        }
        self.aliases.insert(alias.to_string(), target.to_string());
        Ok(())
    }

    /// Resolves aliases; the returned definition carries the canonical name.
    pub fn lookup(&self, name: &str) -> Result<&ToolDefinition> {
        let canonical = self.aliases.get(name).map(String::as_str).unwrap_or(name);
        self.tools
            .get(canonical)
            .ok_or_else(|| Error::UnknownTool(name.to_string()))
    }

    /// Canonical tools in name order.
    pub fn tools(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.values()
    }

    /// `(alias, canonical)` pairs in alias order.
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(a, t)| (a.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn is_taken(&self, name: &str) -> bool {
        self.tools.contains_key(name) || self.aliases.contains_key(name)
    }
}
