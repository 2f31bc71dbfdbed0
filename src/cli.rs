//! Helpers behind the `rulegate_eval` binary: load a JSON document and a JSON filter, run
//! the evaluator, report the outcome.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use serde::Serialize;

use crate::entity::Record;
use crate::evaluator::FilterEvaluator;
use crate::filter::{Condition, Filter, Node};
use crate::value::Value;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EvalReport {
    pub matched: bool,
    pub filter: String,
    pub conditions: usize,
}

pub fn load_object(kind: &str, path: &Path) -> Result<Record> {
    let text = fs::read_to_string(path).with_context(|| format!("reading object {}", path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&text).with_context(|| format!("parsing object {}", path.display()))?;
    Ok(Record::from_json(kind, &json)?)
}

/// Parse a filter document: either the serialized tree form (`connector`/`negated`/
/// `children`) or a flat keyword map such as `{"owner__name__iexact": "bob"}`, which is
/// read as the conjunction of its entries.
pub fn parse_filter(text: &str) -> Result<Filter> {
    let json: serde_json::Value = serde_json::from_str(text).context("parsing filter")?;
    let obj = json.as_object().ok_or_else(|| anyhow!("filter must be a JSON object"))?;
    if obj.contains_key("children") || obj.contains_key("connector") {
        return Ok(serde_json::from_value(json)?);
    }
    let children = obj.iter().map(|(k, v)| Node::Cond(Condition::parse(k, Value::from_json(v)))).collect();
    Ok(Filter { children, ..Filter::default() })
}

pub fn run_eval(kind: &str, object_path: &Path, filter_path: &Path) -> Result<EvalReport> {
    let object = load_object(kind, object_path)?;
    let text = fs::read_to_string(filter_path).with_context(|| format!("reading filter {}", filter_path.display()))?;
    let filter = parse_filter(&text)?;
    let matched = FilterEvaluator::evaluate(&object, &filter).map_err(|e| anyhow!("{} ({})", e, e.code_str()))?;
    crate::tprintln!("eval {} -> {}", filter, matched);
    Ok(EvalReport { matched, filter: filter.to_string(), conditions: filter.conditions().len() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_map_and_tree_forms() {
        let flat = parse_filter(r#"{"name__startswith": "ba", "calories__lt": 100}"#).unwrap();
        assert_eq!(flat.conditions().len(), 2);
        let tree = serde_json::to_string(&(Filter::q("a", 1) | Filter::q("b", 2))).unwrap();
        assert_eq!(parse_filter(&tree).unwrap(), Filter::q("a", 1) | Filter::q("b", 2));
        assert!(parse_filter("[1,2]").is_err());
    }

    #[test]
    fn evaluates_files() {
        let dir = tempfile::tempdir().unwrap();
        let obj = dir.path().join("food.json");
        let flt = dir.path().join("filter.json");
        fs::write(&obj, r#"{"id": 2, "name": "banana", "allergic_users": [{"_kind": "user", "id": "alice"}]}"#).unwrap();
        fs::write(&flt, r#"{"allergic_users__id": "alice"}"#).unwrap();
        let report = run_eval("food", &obj, &flt).unwrap();
        assert!(report.matched);
        assert_eq!(report.conditions, 1);
        fs::write(&flt, r#"{"name__search": "ban"}"#).unwrap();
        assert!(run_eval("food", &obj, &flt).unwrap_err().to_string().contains("unsupported_lookup"));
    }
}
