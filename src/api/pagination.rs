use super::types::QueryResult;
use crate::util::QueryParams;

/// Slices `items` according to the `startIndex` and `limit` parameters.
pub fn apply_pagination<T>(items: Vec<T>, params: &QueryParams) -> QueryResult<T> {
    let total_record_count = items.len();
    let start_index = params.get_usize("startIndex").unwrap_or(0);
    let limit = params.get_usize("limit").unwrap_or(100);

    let items = items.into_iter().skip(start_index).take(limit).collect();

    QueryResult {
        items,
        total_record_count,
        start_index,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_apply_pagination() {
        let params: QueryParams = HashMap::from([
            ("startIndex".to_string(), "2".to_string()),
            ("limit".to_string(), "3".to_string()),
        ])
        .into();

        let page = apply_pagination((0..10).collect(), &params);
        assert_eq!(page.items, vec![2, 3, 4]);
        assert_eq!(page.total_record_count, 10);
        assert_eq!(page.start_index, 2);

        let all = apply_pagination(vec![1, 2], &QueryParams::default());
        assert_eq!(all.items, vec![1, 2]);
        assert_eq!(all.start_index, 0);
    }
}
