/// Turns a channel name as typed by the user into its slug: trimmed,
/// lower-cased, leading `#`s removed, whitespace runs collapsed to `-`.
pub fn derive_slug(raw_name: &str) -> String {
    let lowered = raw_name.trim().to_lowercase();
    let stripped = lowered.trim_start_matches('#');

    let mut slug = String::with_capacity(stripped.len());
    let mut in_gap = false;
    for c in stripped.chars() {
        if c.is_whitespace() {
            if !in_gap {
                slug.push('-');
            }
            in_gap = true;
        } else {
            slug.push(c);
            in_gap = false;
        }
    }
    slug
}
