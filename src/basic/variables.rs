use crate::engine::VariableHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionName {
    pub name: String,
    pub abbreviation: bool,
    pub unicode: bool,
}

impl ExpressionName {
    pub fn abbreviation(name: &str) -> Self {
        Self { name: name.to_string(), abbreviation: true, unicode: !name.is_ascii() }
    }

    pub fn long(name: &str) -> Self {
        Self { name: name.to_string(), abbreviation: false, unicode: !name.is_ascii() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub names: Vec<ExpressionName>,
    pub title: String,
    /// `None` marks a placeholder symbol such as `x`.
    pub value: Option<f64>,
    pub hidden: bool,
}

impl Variable {
    pub fn constant(names: Vec<ExpressionName>, title: &str, value: f64) -> Self {
        Self { names, title: title.to_string(), value: Some(value), hidden: false }
    }

    pub fn placeholder(name: &str) -> Self {
        Self {
            names: vec![ExpressionName::abbreviation(name)],
            title: String::new(),
            value: None,
            hidden: false,
        }
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn is_known(&self) -> bool {
        self.value.is_some()
    }

    /// First name matching the requested style, falling back to any name the
    /// unicode setting permits.
    pub fn preferred_name(&self, abbreviated: bool, unicode: bool) -> &str {
        let allowed = |n: &&ExpressionName| unicode || !n.unicode;
        self.names
            .iter()
            .filter(allowed)
            .find(|n| n.abbreviation == abbreviated)
            .or_else(|| self.names.iter().find(allowed))
            .or_else(|| self.names.first())
            .map(|n| n.name.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct VariableTable {
    variables: Vec<Variable>,
}

impl VariableTable {
    pub fn add(&mut self, variable: Variable) -> VariableHandle {
        self.variables.push(variable);
        VariableHandle(self.variables.len() - 1)
    }

    pub fn get(&self, handle: VariableHandle) -> Option<&Variable> {
        self.variables.get(handle.0)
    }

    pub fn find(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().rev().find(|v| v.names.iter().any(|n| n.name == name))
    }

    pub fn handles(&self) -> impl Iterator<Item = VariableHandle> {
        (0..self.variables.len()).map(VariableHandle)
    }
}
