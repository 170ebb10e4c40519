//! Text rendering for resolution diagnostics.
//!
//! Everything the engine reports to a user goes through these helpers so
//! that cycle chains, type names and keys look the same in every message.

/// Joins a dependency chain with arrows.
///
/// # Examples
/// ```
/// use tarkib_support::rendering::render_chain;
///
/// let chain = ["OrderService", "PaymentGateway", "OrderService"];
/// assert_eq!(render_chain(&chain), "OrderService → PaymentGateway → OrderService");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    let mut rendered = String::new();
    for (i, link) in chain.iter().enumerate() {
        if i > 0 {
            rendered.push_str(" → ");
        }
        rendered.push_str(link.as_ref());
    }
    rendered
}

/// One step of a chain rendered by [`render_chain_vertical`].
#[derive(Debug, Clone)]
pub struct ChainLink {
    /// Display name of the service type
    pub display_name: String,
    /// Lifetime label, e.g. "Transient"
    pub lifetime: String,
    /// How this step was reached, e.g. "deferred"
    pub via: Option<String>,
}

/// Renders a chain top to bottom with lifetime labels.
///
/// ```text
/// [Transient] Clock
///             ↓ (deferred)
/// [Transient] Scheduler
/// ```
pub fn render_chain_vertical(links: &[ChainLink]) -> String {
    let label_width = links.iter().map(|l| l.lifetime.len()).max().unwrap_or(0);
    let mut rendered = String::new();

    for (i, link) in links.iter().enumerate() {
        if i > 0 {
            rendered.push_str(&" ".repeat(label_width + 3));
            rendered.push('↓');
            if let Some(via) = &link.via {
                rendered.push_str(&format!(" ({via})"));
            }
            rendered.push('\n');
        }
        rendered.push_str(&format!(
            "[{:<width$}] {}\n",
            link.lifetime,
            link.display_name,
            width = label_width,
        ));
    }

    rendered
}

/// Drops module paths from every segment of a type name.
///
/// ```
/// use tarkib_support::rendering::shorten_type_name;
///
/// assert_eq!(shorten_type_name("app::orders::OrderService"), "OrderService");
/// assert_eq!(
///     shorten_type_name("collections::Enumerable<app::plugins::Plugin>"),
///     "Enumerable<Plugin>"
/// );
/// assert_eq!(shorten_type_name("app::Clock[]?"), "Clock[]?");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut short = String::with_capacity(full_name.len());
    let mut segment = String::new();
    let mut chars = full_name.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '[' | ']' | '?' => {
                short.push_str(&segment);
                short.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    short.push_str(&segment);
    short
}

/// Formats the optional key suffix used in diagnostics: ` (key "primary")`.
pub fn key_suffix(key: Option<&str>) -> String {
    match key {
        Some(key) => format!(" (key {key:?})"),
        None => String::new(),
    }
}

/// Suggests registered type names close to a requested one.
///
/// Names are compared by their short form; the best `limit` matches are
/// returned, strongest first. The requested name itself is never suggested.
pub fn suggest_similar(requested: &str, available: &[&str], limit: usize) -> Vec<String> {
    let wanted = shorten_type_name(requested).to_lowercase();
    if wanted.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<(usize, &str)> = available
        .iter()
        .filter(|name| **name != requested)
        .filter_map(|&name| {
            let candidate = shorten_type_name(name).to_lowercase();
            similarity(&wanted, &candidate).map(|score| (score, name))
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit)
        .map(|(_, name)| name.to_string())
        .collect()
}

fn similarity(wanted: &str, candidate: &str) -> Option<usize> {
    if candidate == wanted {
        return Some(100);
    }
    if candidate.contains(wanted) || wanted.contains(candidate) {
        return Some(80);
    }

    // Same length class and mostly the same characters in place: a typo.
    if wanted.len().abs_diff(candidate.len()) <= 2 {
        let same = wanted
            .chars()
            .zip(candidate.chars())
            .filter(|(a, b)| a == b)
            .count();
        let longest = wanted.len().max(candidate.len());
        if same * 100 / longest >= 70 {
            return Some(60);
        }
    }

    let prefix = wanted
        .chars()
        .zip(candidate.chars())
        .take_while(|(a, b)| a == b)
        .count();
    (prefix >= 4).then_some(prefix * 5)
}
