//! Text expansion passes run before a prompt is parsed.
//!
//! - [`dynamic`] resolves `<a|b|c>` groups to one random alternative.
//! - [`wildcard`] replaces `__name__` placeholders with a random line from a
//!   named list.
//!
//! Both are pure string rewrites driven by the caller's RNG. The pipeline runs
//! dynamic → wildcard → dynamic so that groups introduced by wildcard lines
//! are resolved too; [`expand_all`] does exactly that.

pub mod dynamic;
pub mod wildcard;

use rand::Rng;

pub use dynamic::expand_dynamic;
pub use wildcard::{WildcardStore, expand_wildcards};

/// Dynamic choice, then wildcards, then dynamic choice again.
pub fn expand_all<R: Rng + ?Sized>(text: &str, wildcards: &WildcardStore, rng: &mut R) -> String {
    let text = expand_dynamic(text, rng);
    let text = expand_wildcards(&text, wildcards, rng);
    expand_dynamic(&text, rng)
}
