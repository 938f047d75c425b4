//! Listing of the named constants an engine knows, for autocompletion.

use serde::{Deserialize, Serialize};

use crate::engine::{ExpressionEngine, VariableHandle};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableEntry {
    /// Abbreviated, unicode-enabled display name, e.g. `π`.
    pub name: String,
    pub description: String,
    /// Never empty.
    pub aliases: Vec<String>,
}

/// Visible, known variables in registration order.
///
/// The listing is computed while iterating; call again for a fresh one.
pub fn list_variables<E>(engine: &E) -> impl Iterator<Item = VariableEntry> + '_
where
    E: ExpressionEngine + ?Sized,
{
    engine
        .variables()
        .into_iter()
        .filter(move |&v| engine.is_known(v) && !engine.is_hidden(v))
        .map(move |v| entry(engine, v))
}

fn entry<E>(engine: &E, variable: VariableHandle) -> VariableEntry
where
    E: ExpressionEngine + ?Sized,
{
    let name = engine.preferred_name(variable, true, true);
    let count = engine.alias_count(variable);
    let aliases = if count < 1 {
        vec![name.clone()]
    } else {
        (1..=count)
            .map(|i| engine.alias_name(variable, i).unwrap_or_default())
            .collect()
    };
    VariableEntry { name, description: engine.description(variable), aliases }
}
