//! Filter evaluation over JSON-loaded object graphs, one lookup family at a time.

use rulegate::{Filter, FilterEvaluator, Record, Value};
use serde_json::json;

fn recipe() -> Record {
    Record::from_json(
        "recipe",
        &json!({
            "id": 7,
            "name": "Fruit Salad",
            "published": "2024-06-02T09:30:00",
            "servings": 4,
            "rating": 4.5,
            "notes": null,
            "tags": ["sweet", "cold"],
            "author": {"_kind": "user", "id": "alice", "city": "Lyon"},
            "ingredients": [
                {"_kind": "food", "id": 1, "name": "apple", "calories": 52, "suppliers": [{"_kind": "farm", "id": "north"}]},
                {"_kind": "food", "id": 2, "name": "banana", "calories": 89, "suppliers": []}
            ]
        }),
    )
    .unwrap()
}

fn check(key: &str, value: impl Into<Value>) -> bool { FilterEvaluator::evaluate(&recipe(), &Filter::q(key, value)).unwrap() }

#[test]
fn equality_and_case() {
    assert!(check("name", "Fruit Salad"));
    assert!(!check("name", "fruit salad"));
    assert!(check("name__iexact", "fruit salad"));
    assert!(check("author__city", "Lyon"));
    assert!(check("author", "alice"));
    assert!(check("author__id", "alice"));
}

#[test]
fn ordering_on_numbers() {
    assert!(check("servings__gt", 3));
    assert!(check("servings__gte", 4));
    assert!(!check("servings__lt", 4));
    assert!(check("rating__lte", 4.5));
    assert!(check("rating__gt", 4));
    assert!(check("servings__range", Value::list([1, 4])));
}

#[test]
fn membership() {
    assert!(check("servings__in", Value::list([2, 4, 6])));
    assert!(!check("servings__in", Value::list(Vec::<i64>::new())));
    assert!(check("tags", "cold"));
    assert!(check("ingredients__name__in", Value::list(["kiwi", "banana"])));
}

#[test]
fn string_matching() {
    assert!(check("name__contains", "Salad"));
    assert!(check("name__icontains", "salad"));
    assert!(check("name__startswith", "Fruit"));
    assert!(check("name__iendswith", "SALAD"));
    assert!(check("ingredients__name__regex", "^ban"));
    assert!(!check("ingredients__name__regex", "^BAN"));
    assert!(check("ingredients__name__iregex", "^BAN"));
}

#[test]
fn date_parts_from_iso_strings() {
    assert!(check("published__year", 2024));
    assert!(check("published__month", 6));
    assert!(check("published__day", 2));
    // 2024-06-02 was a Sunday
    assert!(check("published__week_day", 1));
    assert!(check("published__gte", "2024-06-01"));
}

#[test]
fn fan_out_through_nested_relations() {
    assert!(check("ingredients__calories__gt", 80));
    assert!(!check("ingredients__calories__gt", 100));
    assert!(check("ingredients__suppliers", "north"));
    assert!(!check("ingredients__suppliers__isnull", true));
    assert!(check("ingredients__suppliers__isnull", false));
}

#[test]
fn nulls_and_absent_attributes() {
    assert!(check("notes__isnull", true));
    assert!(check("notes", Value::Null));
    assert!(!check("notes__contains", "x"));
    assert!(check("difficulty__isnull", true));
    assert!(!check("difficulty", "easy"));
    assert!(!check("author__country", "FR"));
}

#[test]
fn negation_is_complement() {
    let r = recipe();
    let filters = [
        Filter::q("name__startswith", "F"),
        Filter::q("ingredients__calories__lt", 60),
        Filter::q("ingredients__name", "kiwi"),
        Filter::q("notes__isnull", false),
        Filter::q("servings", 4) & Filter::q("author__city", "Paris"),
        Filter::q("tags", "hot") | Filter::q("rating__gt", 4),
        Filter::default(),
    ];
    for f in filters {
        let direct = FilterEvaluator::evaluate(&r, &f).unwrap();
        assert_eq!(FilterEvaluator::evaluate(&r, &!f.clone()).unwrap(), !direct, "{}", f);
    }
}

#[test]
fn keyword_conjunction() {
    let r = recipe();
    assert!(FilterEvaluator::evaluate(&r, &Filter::all([("servings", 4), ("ingredients__calories", 52)])).unwrap());
    assert!(!FilterEvaluator::evaluate(&r, &Filter::all([("servings", 4), ("ingredients__calories", 53)])).unwrap());
}

#[test]
fn bad_values_are_errors() {
    let r = recipe();
    assert_eq!(FilterEvaluator::evaluate(&r, &Filter::q("servings__in", 4)).unwrap_err().code_str(), "invalid_value");
    assert_eq!(FilterEvaluator::evaluate(&r, &Filter::q("name__regex", "(")).unwrap_err().code_str(), "invalid_value");
    assert_eq!(FilterEvaluator::evaluate(&r, &Filter::q("name__search", "salad")).unwrap_err().code_str(), "unsupported_lookup");
}

#[test]
fn match_all_dominates_or() {
    let r = recipe();
    let miss = Filter::q("name", "Green Salad");
    assert!(!FilterEvaluator::evaluate(&r, &miss).unwrap());
    assert!(FilterEvaluator::evaluate(&r, &(Filter::default() | miss.clone())).unwrap());
    assert!(FilterEvaluator::evaluate(&r, &(miss.clone() | Filter::default())).unwrap());
    assert!(!FilterEvaluator::evaluate(&r, &(Filter::default() & miss.clone())).unwrap());
    assert!(!FilterEvaluator::evaluate(&r, &(!Filter::default() | miss)).unwrap());
}
