use crate::collection::Collection;

/// Reference-expansion directive applied to list and detail reads.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Expand {
    /// Replace the id in `field` with the referenced document, optionally
    /// restricted to `select`.
    Reference {
        field: &'static str,
        target: Collection,
        select: Option<&'static [&'static str]>,
    },
    /// Attach, under `field`, every document of `source` whose
    /// `foreign_field` points at this document.
    Children {
        field: &'static str,
        source: Collection,
        foreign_field: &'static str,
    },
}

impl Expand {
    /// `bootcamp` → `{ id, name, description }`.
    pub const BOOTCAMP_SUMMARY: Expand = Expand::Reference {
        field: "bootcamp",
        target: Collection::Bootcamps,
        select: Some(&["name", "description"]),
    };

    /// Courses attached to a bootcamp under `courses`.
    pub const BOOTCAMP_COURSES: Expand = Expand::Children {
        field: "courses",
        source: Collection::Courses,
        foreign_field: "bootcamp",
    };
}
