use regex::{Captures, Regex};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::models::query::{ScopedVar, ScopedVars};

/// Template-variable substitution, as provided by the host.
pub trait TemplateSrv: Send + Sync {
    fn replace(&self, template: &str, scoped_vars: &ScopedVars) -> String;
}

// $name | [[name]] | ${name}
static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\w+)|\[\[(\w+)\]\]|\$\{(\w+)\}").expect("variable regex is valid")
});

/// Default substitution: scoped variables first, then instance-level
/// variables. Unknown names are left as written.
#[derive(Debug, Clone, Default)]
pub struct VariableTemplate {
    variables: BTreeMap<String, ScopedVar>,
}

impl VariableTemplate {
    pub fn new(variables: BTreeMap<String, String>) -> Self {
        Self {
            variables: variables
                .into_iter()
                .map(|(name, value)| (name, ScopedVar::new(value)))
                .collect(),
        }
    }

    fn lookup<'a>(&'a self, name: &str, scoped_vars: &'a ScopedVars) -> Option<&'a ScopedVar> {
        scoped_vars.get(name).or_else(|| self.variables.get(name))
    }
}

impl TemplateSrv for VariableTemplate {
    fn replace(&self, template: &str, scoped_vars: &ScopedVars) -> String {
        VARIABLE_RE
            .replace_all(template, |caps: &Captures| {
                let name = caps
                    .get(1)
                    .or_else(|| caps.get(2))
                    .or_else(|| caps.get(3))
                    .map(|m| m.as_str())
                    .unwrap_or_default();
                match self.lookup(name, scoped_vars) {
                    Some(var) => var.render(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}
