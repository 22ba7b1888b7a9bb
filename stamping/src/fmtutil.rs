use std::fmt::Display;

/// Joins the items, formatting each using their `Display` implementation, separated by
/// `separator`.
pub fn join_display<I>(items: I, separator: &str) -> String
where
    I: IntoIterator,
    I::Item: Display,
{
    let mut joined = String::new();
    let mut iterator = items.into_iter().peekable();
    while let Some(item) = iterator.next() {
        joined.push_str(&item.to_string());
        if iterator.peek().is_some() {
            joined.push_str(separator);
        }
    }
    joined
}
