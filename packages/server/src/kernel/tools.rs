//! Tools exposed to specialists during the tool-calling loop.
//!
//! A [`Tool`] has typed arguments (schema generated with `schemars`) and a
//! serializable output. [`ToolBox`] holds a type-erased set and is what the
//! model client receives.

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::common::utils::truncate_for_log;
use crate::kernel::schema::strict_schema;
use crate::kernel::traits::{BaseRetrieval, BaseWebSearch, WebSearchResult};

pub const LEGAL_SEARCH_TOOL: &str = "tool_buscar_rag";
pub const WEB_SEARCH_TOOL: &str = "tool_pesquisa_web";

/// Region hint sent with every web search.
pub const WEB_SEARCH_REGION: &str = "br-pt";
pub const WEB_SEARCH_MAX_RESULTS: usize = 5;

/// Returned to the model when web search yields nothing or fails.
pub const NO_WEB_RESULTS: &str = "Nenhum resultado encontrado na web.";

#[async_trait]
pub trait Tool: Send + Sync {
    const NAME: &'static str;

    type Args: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;
    type Error: std::error::Error + Send + Sync + 'static;

    fn description(&self) -> &str;

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: Self::NAME.to_string(),
            description: self.description().to_string(),
            parameters: strict_schema::<Self::Args>(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn to_openai_format(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": self.name,
                "description": self.description,
                "parameters": self.parameters,
                "strict": true
            }
        })
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Arguments as a JSON string.
    pub arguments: String,
}

impl ToolCall {
    pub fn from_openai_value(value: &serde_json::Value) -> Option<Self> {
        let function = value.get("function")?;
        Some(Self {
            id: value.get("id")?.as_str()?.to_string(),
            name: function.get("name")?.as_str()?.to_string(),
            arguments: function.get("arguments")?.as_str()?.to_string(),
        })
    }
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Failed to parse arguments: {0}")]
    ArgumentParse(String),

    #[error("Tool execution failed: {0}")]
    Execution(String),

    #[error("Failed to serialize output: {0}")]
    OutputSerialize(String),
}

/// Object-safe view of a [`Tool`].
#[async_trait]
pub trait ErasedTool: Send + Sync {
    fn name(&self) -> &str;

    fn definition(&self) -> ToolDefinition;

    async fn call_erased(&self, arguments: &str) -> Result<String, ToolError>;
}

#[async_trait]
impl<T: Tool> ErasedTool for T {
    fn name(&self) -> &str {
        T::NAME
    }

    fn definition(&self) -> ToolDefinition {
        Tool::definition(self)
    }

    async fn call_erased(&self, arguments: &str) -> Result<String, ToolError> {
        let args: T::Args = serde_json::from_str(arguments)
            .map_err(|e| ToolError::ArgumentParse(e.to_string()))?;

        let output = self
            .call(args)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        serde_json::to_string(&output).map_err(|e| ToolError::OutputSerialize(e.to_string()))
    }
}

// =============================================================================
// ToolBox
// =============================================================================

/// The set of tools a single specialist may call.
#[derive(Clone, Default)]
pub struct ToolBox {
    tools: Vec<Arc<dyn ErasedTool>>,
}

impl ToolBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Tool + 'static>(mut self, tool: T) -> Self {
        self.tools.push(Arc::new(tool));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<serde_json::Value> {
        self.tools
            .iter()
            .map(|t| t.definition().to_openai_format())
            .collect()
    }

    /// Execute a call by name. Failures come back as text for the model to
    /// read rather than aborting the loop.
    pub async fn call(&self, name: &str, arguments: &str) -> String {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            warn!(tool = %name, "Unknown tool requested");
            return format!("Error: Unknown tool '{}'", name);
        };

        info!(tool = %name, arguments = %arguments, "Executing tool call");

        match tool.call_erased(arguments).await {
            Ok(result) => {
                info!(
                    tool = %name,
                    result_preview = %truncate_for_log(&result, 200),
                    "Tool execution complete"
                );
                result
            }
            Err(e) => {
                warn!(tool = %name, error = %e, "Tool execution failed");
                format!("Error executing tool: {}", e)
            }
        }
    }
}

impl std::fmt::Debug for ToolBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

// =============================================================================
// Legal search (primary source)
// =============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LegalSearchArgs {
    /// Search terms for the legislation base, e.g. "Fator R anexo III".
    pub termo_busca: String,
}

#[derive(Debug, Serialize)]
pub struct LegalSearchOutput {
    pub resultado: String,
}

/// Queries the cache-backed legislation retrieval.
pub struct LegalSearchTool {
    retrieval: Arc<dyn BaseRetrieval>,
}

impl LegalSearchTool {
    pub fn new(retrieval: Arc<dyn BaseRetrieval>) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl Tool for LegalSearchTool {
    const NAME: &'static str = LEGAL_SEARCH_TOOL;
    type Args = LegalSearchArgs;
    type Output = LegalSearchOutput;
    type Error = ToolError;

    fn description(&self) -> &str {
        "Busca leis, artigos e normas na base jurídica indexada. Fonte PRIMÁRIA: use antes de responder qualquer pergunta técnica."
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let resultado = self
            .retrieval
            .query(&args.termo_busca)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        Ok(LegalSearchOutput { resultado })
    }
}

// =============================================================================
// Web search (secondary source)
// =============================================================================

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WebSearchArgs {
    /// Query for recent news, rulings or figures.
    pub query: String,
}

/// Searches the web. Never fails: errors become [`NO_WEB_RESULTS`].
pub struct WebSearchTool {
    searcher: Arc<dyn BaseWebSearch>,
}

impl WebSearchTool {
    pub fn new(searcher: Arc<dyn BaseWebSearch>) -> Self {
        Self { searcher }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    const NAME: &'static str = WEB_SEARCH_TOOL;
    type Args = WebSearchArgs;
    type Output = String;
    type Error = std::convert::Infallible;

    fn description(&self) -> &str {
        "Pesquisa na web notícias e dados recentes. Fonte SECUNDÁRIA: use apenas para complementar a base jurídica. Cite o link exatamente como aparece em LINK_OBRIGATORIO."
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error> {
        let results = match self
            .searcher
            .search(&args.query, WEB_SEARCH_REGION, WEB_SEARCH_MAX_RESULTS)
            .await
        {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, query = %args.query, "Web search failed, returning empty results");
                Vec::new()
            }
        };

        Ok(render_web_results(&results))
    }
}

/// Render results so each link can be quoted verbatim.
pub fn render_web_results(results: &[WebSearchResult]) -> String {
    if results.is_empty() {
        return NO_WEB_RESULTS.to_string();
    }

    results
        .iter()
        .map(|r| {
            format!(
                "📰 TÍTULO: {}\n📝 RESUMO: {}\n🔗 LINK_OBRIGATORIO: {}",
                r.title, r.snippet, r.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n---\n")
}
