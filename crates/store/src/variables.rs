//! Static credential variables.

use std::collections::HashMap;

use async_trait::async_trait;
use pipeline::{CredentialError, VariableScope, VariableSource};

/// A fixed map of credential variables with team and pipeline scoping.
///
/// A variable `name` requested from team `t`, pipeline `p` is looked up as
/// `t/p/name`, then `t/name`, then `name`; the first hit wins.
#[derive(Debug, Clone, Default)]
pub struct StaticVariables {
    values: HashMap<String, String>,
}

impl StaticVariables {
    /// Creates a source from `path → value` pairs.
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

#[async_trait]
impl VariableSource for StaticVariables {
    async fn get(
        &self,
        scope: &VariableScope,
        name: &str,
    ) -> Result<Option<String>, CredentialError> {
        let candidates = [
            format!("{}/{}/{name}", scope.team, scope.pipeline),
            format!("{}/{name}", scope.team),
            name.to_string(),
        ];
        Ok(candidates
            .iter()
            .find_map(|path| self.values.get(path))
            .cloned())
    }
}
