//! Conversion of [`ProductFilter`] into a Qdrant `Filter`.
//!
//! Filters are conjunctive (`must`) exact keyword matches on the category
//! payload fields; an empty filter converts to `None` so unfiltered
//! queries skip the filter stage entirely.

use crate::store::ProductFilter;
use qdrant_client::qdrant::condition::ConditionOneOf;
use qdrant_client::qdrant::r#match::MatchValue;
use qdrant_client::qdrant::{Condition, FieldCondition, Filter, Match};

pub fn to_qdrant_filter(filter: &ProductFilter) -> Option<Filter> {
    if filter.is_empty() {
        return None;
    }

    let mut must: Vec<Condition> = Vec::new();
    for (key, value) in [
        ("main_category", &filter.main_category),
        ("sub_category", &filter.sub_category),
    ] {
        if let Some(v) = value {
            must.push(Condition {
                condition_one_of: Some(ConditionOneOf::Field(FieldCondition {
                    key: key.to_string(),
                    r#match: Some(Match {
                        match_value: Some(MatchValue::Keyword(v.clone())),
                    }),
                    ..Default::default()
                })),
            });
        }
    }

    Some(Filter {
        must,
        ..Default::default()
    })
}
