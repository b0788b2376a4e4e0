/// Relevance filtering for name searches
///
/// The registry's name search is fuzzy; we keep only hits whose name
/// contains every query token, best matches first.

/// Keep items whose name contains every whitespace-separated token of `query`
///
/// Ordering: exact name match, then names starting with the query, then the
/// rest. Ties keep the registry's original order.
pub fn filter_relevant<T, F>(query: &str, items: Vec<T>, name_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let query = query.trim().to_lowercase();
    let tokens: Vec<&str> = query.split_whitespace().collect();
    if tokens.is_empty() {
        return items;
    }

    let mut ranked: Vec<(u8, T)> = items
        .into_iter()
        .filter_map(|item| {
            let name = name_of(&item).to_lowercase();
            if !tokens.iter().all(|token| name.contains(token)) {
                return None;
            }
            let rank = if name == query {
                0
            } else if name.starts_with(&query) {
                1
            } else {
                2
            };
            Some((rank, item))
        })
        .collect();

    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, item)| item).collect()
}
