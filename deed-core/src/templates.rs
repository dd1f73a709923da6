use rand::seq::SliceRandom;
use rand::Rng;

/// Replaced with the receiver's display name when a deed is rendered.
pub const TARGET_PLACEHOLDER: &str = "{target}";

pub const DEFAULT_TEMPLATES: &[&str] = &[
    "Give {target} a sincere compliment three times this week",
    "Leave {target} an anonymous thank-you note",
    "Bring {target} a coffee or a snack",
    "Help {target} with a chore without being asked",
    "Send {target} a message about something you admire in them",
    "Share a song or book you think {target} would love",
    "Do something kind for a stranger and tell {target} about it",
];

/// Picks a template uniformly, falling back to [`DEFAULT_TEMPLATES`] when the
/// pool is empty.
pub fn pick_template<'a, R: Rng + ?Sized>(pool: &'a [String], rng: &mut R) -> &'a str {
    match pool.choose(rng) {
        Some(template) => template.as_str(),
        None => DEFAULT_TEMPLATES
            .choose(rng)
            .copied()
            .unwrap_or(DEFAULT_TEMPLATES[0]),
    }
}

pub fn render_template(template: &str, target_name: &str) -> String {
    template.replace(TARGET_PLACEHOLDER, target_name)
}
