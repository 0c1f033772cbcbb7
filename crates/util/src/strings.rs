/// Returns the last `|`-separated segment of a container name.
///
/// Fuzz containers are named by their full path (`"root|body|id"`); the
/// request parameter is the final segment. A name without `|` is returned
/// as is.
///
/// # Examples
///
/// ```
/// use apifuzzer_util::container_name_to_param;
///
/// assert_eq!(container_name_to_param("a|b|c"), "c");
/// assert_eq!(container_name_to_param("solo"), "solo");
/// ```
pub fn container_name_to_param(container_name: &str) -> &str {
    container_name.rsplit('|').next().unwrap_or(container_name)
}
