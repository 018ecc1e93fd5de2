//! Remote tool protocol: tools served by an external process or endpoint.

use async_trait::async_trait;

use super::arguments::ToolArguments;
use super::tool::ToolContext;
use super::types::ToolFunction;
use crate::error::HubError;
use crate::types::MessageContent;

/// A bridge to tools that live outside this process.
///
/// The dispatcher asks the remote side first. `proxy_call` must fail with
/// [`HubError::ToolNotRecognized`] for names it does not serve so the local
/// registry can take over.
#[async_trait]
pub trait RemoteToolProtocol: Send + Sync {
    /// List the tools the remote side serves.
    async fn list_tools(&self) -> Result<Vec<ToolFunction>, HubError>;

    /// Invoke a remote tool and return its output content.
    async fn proxy_call(
        &self,
        name: &str,
        args: &ToolArguments,
        ctx: &ToolContext,
    ) -> Result<MessageContent, HubError>;
}

/// Which remote tools an agent exposes to its model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RemoteSelection {
    #[default]
    None,
    All,
    Named(Vec<String>),
}

impl RemoteSelection {
    /// `["*"]` selects everything, an empty list nothing.
    pub fn from_names(names: &[String]) -> Self {
        if names.is_empty() {
            Self::None
        } else if names.iter().any(|n| n == "*") {
            Self::All
        } else {
            Self::Named(names.to_vec())
        }
    }

    pub fn filter(&self, functions: Vec<ToolFunction>) -> Vec<ToolFunction> {
        match self {
            Self::None => Vec::new(),
            Self::All => functions,
            Self::Named(names) => functions
                .into_iter()
                .filter(|f| names.iter().any(|n| n == &f.name))
                .collect(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::ToolParameters;

    fn function(name: &str) -> ToolFunction {
        ToolFunction::publish(name, "", &ToolParameters::empty())
    }

    #[test]
    fn selection_from_names() {
        assert_eq!(RemoteSelection::from_names(&[]), RemoteSelection::None);
        assert_eq!(RemoteSelection::from_names(&["*".into()]), RemoteSelection::All);

        let named = RemoteSelection::from_names(&["search".into()]);
        let kept = named.filter(vec![function("search"), function("fetch")]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].name, "search");
    }
}
