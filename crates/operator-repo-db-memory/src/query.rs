use std::cmp::Ordering;

use operator_repo_storage::{Operator, OperatorFilter, SortDirection, SortSpec, StorageError};
use regex::Regex;
use serde_json::Value;

/// An [`OperatorFilter`] with its name pattern compiled once per query.
pub struct CompiledFilter<'a> {
    filter: &'a OperatorFilter,
    pattern: Option<Regex>,
}

impl<'a> CompiledFilter<'a> {
    pub fn compile(filter: &'a OperatorFilter) -> Result<Self, StorageError> {
        let pattern = filter
            .name_pattern
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|e| StorageError::invalid_query(format!("invalid search pattern: {e}")))?;
        Ok(Self { filter, pattern })
    }

    /// Check if an operator satisfies every predicate of the filter
    pub fn matches(&self, operator: &Operator) -> bool {
        if let Some(ids) = &self.filter.ids
            && !ids.iter().any(|id| id == &operator.id)
        {
            return false;
        }

        if let Some(owner) = &self.filter.owner
            && !operator.is_owned_by(owner)
        {
            return false;
        }

        if let Some(caller) = &self.filter.visible_to
            && !operator.is_visible_to(caller)
        {
            return false;
        }

        match &self.pattern {
            Some(re) => re.is_match(&operator.name),
            None => true,
        }
    }
}

/// Sorts operators the way a document store would: by the requested field,
/// then `_id` ascending.
pub fn sort_operators(operators: Vec<Operator>, sort: &SortSpec) -> Vec<Operator> {
    let field = sort.store_field().to_string();
    let mut keyed: Vec<(Value, Operator)> = operators
        .into_iter()
        .map(|op| {
            let key = serde_json::to_value(&op)
                .ok()
                .and_then(|doc| lookup(&doc, &field).cloned())
                .unwrap_or(Value::Null);
            (key, op)
        })
        .collect();

    keyed.sort_by(|(ka, a), (kb, b)| {
        let primary = compare_values(ka, kb);
        let primary = match sort.direction {
            SortDirection::Asc => primary,
            SortDirection::Desc => primary.reverse(),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    });

    keyed.into_iter().map(|(_, op)| op).collect()
}

/// Resolves a dotted path (`inputs.0.name`) inside a document.
fn lookup<'v>(doc: &'v Value, path: &str) -> Option<&'v Value> {
    path.split('.').try_fold(doc, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Cross-type rank following document-store comparison order.
fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
        Value::Bool(_) => 8,
    }
}

pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        // binary collation
        (Value::String(x), Value::String(y)) => x.as_bytes().cmp(y.as_bytes()),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Array(xs), Value::Array(ys)) => {
            for (x, y) in xs.iter().zip(ys.iter()) {
                let ord = compare_values(x, y);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            xs.len().cmp(&ys.len())
        }
        (Value::Object(_), Value::Object(_)) => a.to_string().cmp(&b.to_string()),
        _ => Ordering::Equal,
    }
}
