//! Collection catalogue: names, queryable-field allow-lists, hidden fields,
//! uniqueness constraints and parent/ownership relations.

use serde::{Deserialize, Serialize};

/// The four resource collections.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Bootcamps,
    Courses,
    Reviews,
    Users,
}

/// Type of a queryable field; drives filter-value parsing.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    /// RFC 3339 timestamp or `YYYY-MM-DD`.
    Date,
    /// Reference to another resource (uuid).
    Id,
    /// A list of strings; equality means "contains".
    TextList,
}

/// One entry of a collection's query allow-list.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub path: &'static str,
    pub kind: FieldKind,
}

const fn field(path: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { path, kind }
}

/// Fields every document carries.
const COMMON_FIELDS: &[FieldSpec] = &[
    field("id", FieldKind::Id),
    field("createdAt", FieldKind::Date),
];

const BOOTCAMP_FIELDS: &[FieldSpec] = &[
    field("name", FieldKind::Text),
    field("slug", FieldKind::Text),
    field("description", FieldKind::Text),
    field("website", FieldKind::Text),
    field("phone", FieldKind::Text),
    field("email", FieldKind::Text),
    field("address", FieldKind::Text),
    field("location.formattedAddress", FieldKind::Text),
    field("location.street", FieldKind::Text),
    field("location.city", FieldKind::Text),
    field("location.state", FieldKind::Text),
    field("location.zipcode", FieldKind::Text),
    field("location.country", FieldKind::Text),
    field("careers", FieldKind::TextList),
    field("averageRating", FieldKind::Number),
    field("averageCost", FieldKind::Number),
    field("photo", FieldKind::Text),
    field("housing", FieldKind::Bool),
    field("jobAssistance", FieldKind::Bool),
    field("jobGuarantee", FieldKind::Bool),
    field("acceptGi", FieldKind::Bool),
    field("user", FieldKind::Id),
];

const COURSE_FIELDS: &[FieldSpec] = &[
    field("title", FieldKind::Text),
    field("description", FieldKind::Text),
    field("weeks", FieldKind::Text),
    field("tuition", FieldKind::Number),
    field("minimumSkill", FieldKind::Text),
    field("scholarshipAvailable", FieldKind::Bool),
    field("bootcamp", FieldKind::Id),
    field("user", FieldKind::Id),
];

const REVIEW_FIELDS: &[FieldSpec] = &[
    field("title", FieldKind::Text),
    field("text", FieldKind::Text),
    field("rating", FieldKind::Number),
    field("bootcamp", FieldKind::Id),
    field("user", FieldKind::Id),
];

const USER_FIELDS: &[FieldSpec] = &[
    field("name", FieldKind::Text),
    field("email", FieldKind::Text),
    field("role", FieldKind::Text),
];

/// Reference from a child collection to its parent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParentRef {
    pub collection: Collection,
    /// Field on the child holding the parent id.
    pub field: &'static str,
}

/// How the owning user of a document is determined.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Ownership {
    /// The document's own `user` field.
    OwnField,
    /// The `user` field of the parent document.
    ViaParent,
    /// No owner; only administrators may mutate.
    AdminOnly,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Bootcamps,
        Collection::Courses,
        Collection::Reviews,
        Collection::Users,
    ];

    /// Storage name (also the URL segment).
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Bootcamps => "bootcamps",
            Collection::Courses => "courses",
            Collection::Reviews => "reviews",
            Collection::Users => "users",
        }
    }

    /// Human-readable singular used in error messages.
    pub const fn label(self) -> &'static str {
        match self {
            Collection::Bootcamps => "Bootcamp",
            Collection::Courses => "Course",
            Collection::Reviews => "Review",
            Collection::Users => "User",
        }
    }

    fn own_fields(self) -> &'static [FieldSpec] {
        match self {
            Collection::Bootcamps => BOOTCAMP_FIELDS,
            Collection::Courses => COURSE_FIELDS,
            Collection::Reviews => REVIEW_FIELDS,
            Collection::Users => USER_FIELDS,
        }
    }

    /// All queryable fields (common fields first).
    pub fn fields(self) -> impl Iterator<Item = &'static FieldSpec> {
        COMMON_FIELDS.iter().chain(self.own_fields().iter())
    }

    /// Look up a queryable field. Hidden fields are never returned.
    pub fn field(self, path: &str) -> Option<&'static FieldSpec> {
        if self.is_hidden(path) {
            return None;
        }
        self.fields().find(|f| f.path == path)
    }

    /// Fields stored on the document but never exposed through the API.
    pub const fn hidden_fields(self) -> &'static [&'static str] {
        match self {
            Collection::Users => &["password", "resetPasswordToken", "resetPasswordExpire"],
            _ => &[],
        }
    }

    /// Whether `path` can appear in a field selection: a queryable field or
    /// the root object of queryable nested fields (e.g. `location`).
    pub fn is_selectable(self, path: &str) -> bool {
        if self.is_hidden(path) {
            return false;
        }
        self.fields().any(|f| {
            f.path == path
                || f
                    .path
                    .strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    pub fn is_hidden(self, path: &str) -> bool {
        let root = path.split('.').next().unwrap_or(path);
        self.hidden_fields().contains(&root)
    }

    /// Uniqueness constraints; each entry is a (possibly compound) key.
    pub const fn unique_keys(self) -> &'static [&'static [&'static str]] {
        match self {
            Collection::Bootcamps => &[&["name"]],
            Collection::Courses => &[],
            Collection::Reviews => &[&["bootcamp", "user"]],
            Collection::Users => &[&["email"]],
        }
    }

    pub const fn parent(self) -> Option<ParentRef> {
        match self {
            Collection::Courses | Collection::Reviews => Some(ParentRef {
                collection: Collection::Bootcamps,
                field: "bootcamp",
            }),
            Collection::Bootcamps | Collection::Users => None,
        }
    }

    /// Collections whose documents are removed together with a parent of
    /// this collection.
    pub fn children(self) -> impl Iterator<Item = (Collection, ParentRef)> {
        Self::ALL
            .into_iter()
            .filter_map(move |c| c.parent().filter(|p| p.collection == self).map(|p| (c, p)))
    }

    pub const fn ownership(self) -> Ownership {
        match self {
            Collection::Bootcamps | Collection::Reviews => Ownership::OwnField,
            Collection::Courses => Ownership::ViaParent,
            Collection::Users => Ownership::AdminOnly,
        }
    }
}

impl core::fmt::Display for Collection {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}
