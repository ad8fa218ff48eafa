pub mod fixed_length_formatter;
pub mod lookup;
pub mod noop;

pub use fixed_length_formatter::{AttributeFormat, FixedLengthFormatter};
pub use lookup::{Lookup, LookupState, Route};
pub use noop::Noop;

use crate::core::ComponentRuntime;

/// Pulls the built-in components into every binary that reaches the
/// registry. Their `inventory` submissions live next to the types, and a
/// linker may drop an object file nothing references.
#[inline(never)]
pub(crate) fn link_builtin() {
    let builtin: [Box<dyn ComponentRuntime>; 3] = [
        Box::new(Noop::default()),
        Box::new(Lookup::default()),
        Box::new(FixedLengthFormatter::default()),
    ];
    std::hint::black_box(builtin);
}
